// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Display formatting for chat interface
//!
//! The formatting functions return strings rather than writing directly to
//! stdout, making them easy to test. [`TerminalDisplay`] is the observer that
//! writes them to a terminal with role colors.

use std::io::{self, Write};

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};
use serde_json::Value;

use crate::chat::assembler::MessageKind;
use crate::chat::engine::ChatObserver;
use crate::error::{RelayError, Result};
use crate::llm::message::{AssistantReply, Message, Role, ToolCall};

/// Longest tool output shown before truncation
const MAX_TOOL_OUTPUT_CHARS: usize = 500;

/// Color used for a message role
pub fn role_color(role: Role) -> Color {
    match role {
        Role::System => Color::Red,
        Role::User => Color::Green,
        Role::Assistant => Color::Blue,
        Role::Tool => Color::Magenta,
    }
}

/// Color used for assistant tool-call requests
pub const TOOL_CALL_COLOR: Color = Color::Yellow;

/// Render argument JSON as `key=value` pairs.
///
/// Strings keep their quotes so they read like literals. Text that is not a
/// JSON object is shown as-is.
pub fn format_arguments(arguments: &str) -> String {
    if arguments.trim().is_empty() {
        return String::new();
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", "),
        _ => arguments.to_string(),
    }
}

/// Render a tool call as `name(key=value, ...)`
pub fn format_tool_call(call: &ToolCall) -> String {
    format!(
        "{}({})",
        call.function.name,
        format_arguments(&call.function.arguments)
    )
}

/// Truncate a string for display with ellipsis
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// One-line rendering of a message with its color
pub fn format_message(message: &Message) -> (Color, String) {
    match message {
        Message::System { content } => (role_color(Role::System), format!("system: {}", content)),
        Message::User { content } => (role_color(Role::User), format!("user: {}", content)),
        Message::Assistant(AssistantReply::Text(text)) => {
            (role_color(Role::Assistant), format!("assistant: {}", text))
        }
        Message::Assistant(AssistantReply::ToolCalls(calls)) => (
            TOOL_CALL_COLOR,
            format!(
                "assistant called: {}",
                calls
                    .iter()
                    .map(format_tool_call)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ),
        Message::Tool { name, content, .. } => (
            role_color(Role::Tool),
            format!(
                "function ({}): {}",
                name,
                truncate_string(content, MAX_TOOL_OUTPUT_CHARS)
            ),
        ),
    }
}

/// Observer that prints the conversation to a terminal
pub struct TerminalDisplay<W: Write + Send = io::Stdout> {
    out: W,
    echo_user: bool,
    streaming: Option<MessageKind>,
    /// Tool calls announced in the current reply
    calls_shown: usize,
}

impl TerminalDisplay<io::Stdout> {
    /// Display on stdout; user input is not echoed since the terminal already shows it
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            echo_user: false,
            streaming: None,
            calls_shown: 0,
        }
    }

    /// Also print user messages
    pub fn echo_user(mut self, echo: bool) -> Self {
        self.echo_user = echo;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_line(&mut self, color: Color, line: &str) -> Result<()> {
        self.out.execute(SetForegroundColor(color))?;
        writeln!(self.out, "{}", line)?;
        self.out.execute(ResetColor)?;
        self.out.flush()?;
        Ok(())
    }

    /// Close a live line: newline and default color
    fn close_stream(&mut self) -> Result<bool> {
        if self.streaming.take().is_none() {
            return Ok(false);
        }
        writeln!(self.out)?;
        self.out.execute(ResetColor)?;
        self.out.flush()?;
        Ok(true)
    }
}

impl<W: Write + Send> ChatObserver for TerminalDisplay<W> {
    fn on_message(&mut self, message: &Message) -> Result<()> {
        if message.role() == Role::User && !self.echo_user {
            return Ok(());
        }
        let (color, line) = format_message(message);
        self.print_line(color, &line)
    }

    fn on_stream_start(&mut self, _role: Role, kind: MessageKind) -> Result<()> {
        self.streaming = Some(kind);
        self.calls_shown = 0;
        match kind {
            MessageKind::Text => {
                self.out.execute(SetForegroundColor(role_color(Role::Assistant)))?;
                write!(self.out, "assistant: ")?;
            }
            MessageKind::ToolCalls => {
                self.out.execute(SetForegroundColor(TOOL_CALL_COLOR))?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn on_tool_call(&mut self, name: &str) -> Result<()> {
        if self.calls_shown > 0 {
            writeln!(self.out)?;
        }
        self.calls_shown += 1;
        write!(self.out, "assistant called: {} ", name)?;
        self.out.flush()?;
        Ok(())
    }

    fn on_fragment(&mut self, fragment: &str) -> Result<()> {
        write!(self.out, "{}", fragment)?;
        self.out.flush()?;
        Ok(())
    }

    fn on_stream_end(&mut self, message: &Message) -> Result<()> {
        if self.close_stream()? {
            return Ok(());
        }
        let (color, line) = format_message(message);
        self.print_line(color, &line)
    }

    fn on_stream_error(&mut self, _error: &RelayError) -> Result<()> {
        self.close_stream()?;
        Ok(())
    }
}
