// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Message types for LLM interactions
//!
//! Defines the message structures exchanged with the completion service and
//! the append-only conversation store.

use serde::{Deserialize, Serialize};

/// A message in a conversation
///
/// One variant per role. An assistant message holds either text or tool
/// calls, never both and never neither.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// System prompt
    System { content: String },
    /// User input
    User { content: String },
    /// Assistant response
    Assistant(AssistantReply),
    /// Result of a tool call
    Tool {
        name: String,
        content: String,
        tool_call_id: String,
    },
}

/// Body of an assistant message
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    /// Plain text answer
    Text(String),
    /// Request to run one or more tools (never empty)
    ToolCalls(Vec<ToolCall>),
}

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool result
    Tool,
}

/// A tool call requested by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier echoed back in the tool result
    pub id: String,
    /// Function to call
    pub function: FunctionCall,
}

/// Function name and its JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Parse the accumulated argument text into a JSON object.
    ///
    /// An empty argument string means "no arguments".
    pub fn parse_arguments(
        &self,
    ) -> serde_json::Result<serde_json::Map<String, serde_json::Value>> {
        if self.function.arguments.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        serde_json::from_str(&self.function.arguments)
    }
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Create a new assistant text message
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant(AssistantReply::Text(content.into()))
    }

    /// Create an assistant message requesting tool calls.
    ///
    /// Returns `None` for an empty list, which is not a valid assistant message.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Option<Self> {
        if tool_calls.is_empty() {
            None
        } else {
            Some(Message::Assistant(AssistantReply::ToolCalls(tool_calls)))
        }
    }

    /// Create a tool result message
    pub fn tool(
        name: impl Into<String>,
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Message::Tool {
            name: name.into(),
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Role of the sender
    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant(_) => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, absent for tool-call messages
    pub fn content(&self) -> Option<&str> {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Tool { content, .. } => Some(content),
            Message::Assistant(AssistantReply::Text(text)) => Some(text),
            Message::Assistant(AssistantReply::ToolCalls(_)) => None,
        }
    }

    /// Tool calls, present only on assistant tool-call messages
    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        match self {
            Message::Assistant(AssistantReply::ToolCalls(calls)) => Some(calls),
            _ => None,
        }
    }

    /// Tool name on tool result messages
    pub fn name(&self) -> Option<&str> {
        match self {
            Message::Tool { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Originating call id on tool result messages
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Check if message requests any tool call
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().is_some_and(|calls| !calls.is_empty())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// Conversation history
///
/// Append-only: messages are never removed or reordered for the lifetime of
/// the store. The system prompt is kept apart and prepended at request time.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    system_prompt: Option<String>,
}

impl Conversation {
    /// Create a new empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation with a system prompt
    pub fn with_system(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![],
            system_prompt: Some(system_prompt.into()),
        }
    }

    /// Set (or replace) the system prompt
    pub fn set_system(&mut self, system_prompt: impl Into<String>) {
        self.system_prompt = Some(system_prompt.into());
    }

    /// Current system prompt
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Add a message to the conversation
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All appended messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Get the last assistant message
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::Assistant)
    }

    /// Check if the conversation is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Messages to send with a request: the system prompt (if any) followed by
    /// the history.
    pub fn request_messages(&self) -> Vec<Message> {
        let mut result = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = &self.system_prompt {
            result.push(Message::system(system.clone()));
        }
        result.extend(self.messages.iter().cloned());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_accessors() {
        let msg = Message::user("hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.content(), Some("hello"));
        assert!(msg.tool_calls().is_none());
        assert!(msg.name().is_none());
        assert!(msg.tool_call_id().is_none());
    }

    #[test]
    fn test_assistant_text_has_no_tool_calls() {
        let msg = Message::assistant("answer");
        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.content(), Some("answer"));
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_assistant_tool_calls_has_no_content() {
        let msg = Message::assistant_tool_calls(vec![ToolCall::new("call_1", "f", "{}")]).unwrap();
        assert!(msg.content().is_none());
        assert_eq!(msg.tool_calls().unwrap().len(), 1);
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn test_assistant_tool_calls_rejects_empty() {
        assert!(Message::assistant_tool_calls(vec![]).is_none());
    }

    #[test]
    fn test_tool_message_fields() {
        let msg = Message::tool("get_location", "beijing", "call_9");
        assert_eq!(msg.role(), Role::Tool);
        assert_eq!(msg.name(), Some("get_location"));
        assert_eq!(msg.content(), Some("beijing"));
        assert_eq!(msg.tool_call_id(), Some("call_9"));
    }

    #[test]
    fn test_parse_arguments_empty_is_empty_object() {
        let call = ToolCall::new("id", "f", "  ");
        assert!(call.parse_arguments().unwrap().is_empty());
    }

    #[test]
    fn test_parse_arguments_object() {
        let call = ToolCall::new("id", "f", r#"{"location":"Boston, MA"}"#);
        let args = call.parse_arguments().unwrap();
        assert_eq!(args["location"], "Boston, MA");
    }

    #[test]
    fn test_parse_arguments_rejects_non_object() {
        let call = ToolCall::new("id", "f", "[1,2]");
        assert!(call.parse_arguments().is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn test_conversation_request_messages_prefix_system() {
        let mut conv = Conversation::with_system("be brief");
        conv.push(Message::user("hi"));
        let msgs = conv.request_messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], Message::system("be brief"));
        assert_eq!(msgs[1], Message::user("hi"));
        // The system prompt is not part of the stored history
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_conversation_without_system() {
        let mut conv = Conversation::new();
        conv.push(Message::user("hi"));
        assert_eq!(conv.request_messages(), vec![Message::user("hi")]);
    }

    #[test]
    fn test_conversation_set_system_replaces() {
        let mut conv = Conversation::with_system("a");
        conv.set_system("b");
        assert_eq!(conv.system_prompt(), Some("b"));
    }

    #[test]
    fn test_conversation_last_assistant() {
        let mut conv = Conversation::new();
        conv.push(Message::user("q"));
        conv.push(Message::assistant("a1"));
        conv.push(Message::tool("t", "r", "c"));
        assert_eq!(conv.last_assistant(), Some(&Message::assistant("a1")));
        assert_eq!(conv.last().and_then(Message::name), Some("t"));
    }
}
