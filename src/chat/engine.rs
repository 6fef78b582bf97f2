// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat engine loop.
//!
//! This module owns the request cycle: it sends the conversation to the
//! provider with retry, assembles the streamed reply while an observer
//! displays it, runs requested tools, and re-requests until the model answers
//! without tool calls.

use std::sync::Arc;

use crate::chat::assembler::{MessageKind, StreamAssembler};
use crate::config::Settings;
use crate::error::{RelayError, Result};
use crate::llm::message::{Conversation, Message, Role};
use crate::llm::provider::{CompletionRequest, LlmProvider, ToolChoice, ToolSchema};
use crate::llm::retry::{with_retry, RetryConfig};
use crate::tools::{Tool, ToolRegistry};

/// Hooks for frontends that render the conversation as it happens.
pub trait ChatObserver: Send {
    /// A caller or tool message was appended
    fn on_message(&mut self, _message: &Message) -> Result<()> {
        Ok(())
    }

    /// An assistant reply started streaming
    fn on_stream_start(&mut self, _role: Role, _kind: MessageKind) -> Result<()> {
        Ok(())
    }

    /// A tool call in the streaming reply is about to receive its arguments
    fn on_tool_call(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Next piece of reply text or tool-call arguments
    fn on_fragment(&mut self, _fragment: &str) -> Result<()> {
        Ok(())
    }

    /// The streamed reply is complete and about to be appended
    fn on_stream_end(&mut self, _message: &Message) -> Result<()> {
        Ok(())
    }

    /// The streamed reply failed; nothing will be appended
    fn on_stream_error(&mut self, _error: &RelayError) -> Result<()> {
        Ok(())
    }
}

/// Announce tool calls `from..to` (clamped to the known calls); returns the
/// new count of announced calls.
fn announce_calls(
    observer: &mut dyn ChatObserver,
    names: &[&str],
    from: usize,
    to: usize,
) -> Result<usize> {
    let to = to.min(names.len());
    for name in names.iter().take(to).skip(from) {
        observer.on_tool_call(name)?;
    }
    Ok(from.max(to))
}

/// No-op observer for callers that don't need output hooks.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ChatObserver for NoopObserver {}

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Model used when a request names none
    pub model: String,
    pub system_prompt: Option<String>,
    pub tool_choice: ToolChoice,
    /// Tool rounds allowed per turn, 0 for no limit
    pub max_tool_rounds: usize,
    pub retry: RetryConfig,
}

impl ChatConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.provider.default_model.clone(),
            system_prompt: settings.conversation.system_prompt.clone(),
            tool_choice: settings
                .conversation
                .tool_choice
                .parse()
                .unwrap_or_default(),
            max_tool_rounds: settings.conversation.max_tool_rounds,
            retry: RetryConfig::from(&settings.resilience),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Issues streaming completion requests with retry
#[derive(Clone)]
pub struct RequestClient {
    provider: Arc<dyn LlmProvider>,
    retry: RetryConfig,
    model: String,
}

impl RequestClient {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            retry,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one streaming request and open an assembler on the reply.
    ///
    /// Tools and tool choice are only sent when `tools` is non-empty. An
    /// attempt counts as successful once the first chunk has arrived.
    pub async fn request(
        &self,
        messages: Vec<Message>,
        tools: &[ToolSchema],
        tool_choice: ToolChoice,
        model: Option<&str>,
    ) -> Result<StreamAssembler> {
        let mut request = CompletionRequest::new(model.unwrap_or(&self.model), messages);
        if !tools.is_empty() {
            request = request.with_tools(tools.to_vec(), tool_choice);
        }

        tracing::debug!(
            target: "relay.chat.engine",
            provider = self.provider.name(),
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "issuing completion request"
        );

        with_retry(
            || {
                let provider = Arc::clone(&self.provider);
                let request = request.clone();
                async move {
                    let chunks = provider.complete_stream(request).await?;
                    StreamAssembler::new(chunks).await
                }
            },
            &self.retry,
            "completion request",
        )
        .await
    }
}

/// A conversation with a model that may call tools
pub struct Chat {
    client: RequestClient,
    tools: ToolRegistry,
    conversation: Conversation,
    tool_choice: ToolChoice,
    max_tool_rounds: usize,
    observer: Box<dyn ChatObserver>,
}

impl Chat {
    pub fn new(provider: Arc<dyn LlmProvider>, config: ChatConfig) -> Self {
        let conversation = match config.system_prompt {
            Some(prompt) => Conversation::with_system(prompt),
            None => Conversation::new(),
        };

        Self {
            client: RequestClient::new(provider, config.model, config.retry),
            tools: ToolRegistry::new(),
            conversation,
            tool_choice: config.tool_choice,
            max_tool_rounds: config.max_tool_rounds,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn from_settings(provider: Arc<dyn LlmProvider>, settings: &Settings) -> Self {
        Self::new(provider, ChatConfig::from_settings(settings))
    }

    /// Replace the observer
    pub fn with_observer(mut self, observer: impl ChatObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.conversation.set_system(prompt);
    }

    /// Register a tool under its own name, replacing any tool with that name
    pub fn register_tool(&mut self, tool: impl Tool + 'static) {
        self.tools.register(tool);
    }

    /// Register a tool under an explicit name
    pub fn register_tool_as(&mut self, name: impl Into<String>, tool: impl Tool + 'static) {
        self.tools.register_as(name, tool);
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    /// Schemas offered to the model, in registration order
    pub fn tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools.schemas()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Display a message and append it to the conversation
    pub fn add(&mut self, message: Message) -> Result<()> {
        self.observer.on_message(&message)?;
        self.conversation.push(message);
        Ok(())
    }

    /// Drain a reply while displaying it, then append the assembled message
    pub async fn add_stream(&mut self, assembler: StreamAssembler) -> Result<Message> {
        self.observer.on_stream_start(assembler.role(), assembler.kind())?;

        match self.drain(assembler).await {
            Ok(message) => {
                self.observer.on_stream_end(&message)?;
                self.conversation.push(message.clone());
                Ok(message)
            }
            Err(error) => {
                self.observer.on_stream_error(&error)?;
                Err(error)
            }
        }
    }

    /// Hand every fragment to the observer, announcing each tool call before
    /// its first argument fragment
    async fn drain(&mut self, mut assembler: StreamAssembler) -> Result<Message> {
        let mut announced = 0;
        while let Some(fragment) = assembler.next_fragment().await? {
            if let Some((position, _)) = assembler.current_call() {
                announced = announce_calls(
                    self.observer.as_mut(),
                    &assembler.tool_call_names(),
                    announced,
                    position + 1,
                )?;
            }
            self.observer.on_fragment(&fragment)?;
        }

        // Calls without argument text
        announce_calls(
            self.observer.as_mut(),
            &assembler.tool_call_names(),
            announced,
            usize::MAX,
        )?;
        assembler.finish().await
    }

    /// Request a completion for the current conversation.
    ///
    /// `None` arguments fall back to every registered tool, the configured
    /// tool choice and the configured model. Passing an empty tool slice sends
    /// the request without tools.
    pub async fn request(
        &self,
        tools: Option<&[ToolSchema]>,
        tool_choice: Option<ToolChoice>,
        model: Option<&str>,
    ) -> Result<StreamAssembler> {
        let registered;
        let tools = match tools {
            Some(tools) => tools,
            None => {
                registered = self.tools.schemas();
                &registered
            }
        };

        self.client
            .request(
                self.conversation.request_messages(),
                tools,
                tool_choice.unwrap_or_else(|| self.tool_choice.clone()),
                model,
            )
            .await
    }

    /// Append a message and run the request cycle until the model answers
    /// without tool calls; returns that answer.
    ///
    /// Messages appended before a failure stay in the conversation.
    pub async fn process(&mut self, message: Message) -> Result<Message> {
        self.add(message)?;

        let mut rounds = 0usize;
        loop {
            let assembler = self.request(None, None, None).await?;
            let reply = self.add_stream(assembler).await?;

            let Some(calls) = reply.tool_calls().map(<[_]>::to_vec) else {
                tracing::debug!(
                    target: "relay.chat.engine",
                    rounds,
                    history = self.conversation.len(),
                    "turn complete"
                );
                return Ok(reply);
            };

            rounds += 1;
            if self.max_tool_rounds > 0 && rounds > self.max_tool_rounds {
                tracing::warn!(
                    target: "relay.chat.engine",
                    limit = self.max_tool_rounds,
                    "tool round limit exceeded"
                );
                return Err(RelayError::RoundLimitExceeded {
                    rounds: self.max_tool_rounds,
                });
            }

            tracing::debug!(
                target: "relay.chat.engine",
                round = rounds,
                calls = calls.len(),
                "running tool calls"
            );

            for call in &calls {
                let result = self.tools.invoke(call).await;
                let content = result.output_text().to_string();
                self.add(Message::tool(result.name, content, result.tool_call_id))?;
            }
        }
    }

    /// Shorthand for processing a user message
    pub async fn send(&mut self, text: impl Into<String>) -> Result<Message> {
        self.process(Message::user(text)).await
    }
}

impl std::fmt::Debug for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chat")
            .field("model", &self.client.model())
            .field("tools", &self.tools)
            .field("messages", &self.conversation.len())
            .field("tool_choice", &self.tool_choice)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}
