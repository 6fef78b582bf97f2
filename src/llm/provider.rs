// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM Provider trait and related types
//!
//! Defines the abstraction layer over the remote completion service.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::str::FromStr;

use crate::error::Result;
use crate::llm::message::{Message, Role};

/// Stream of incremental chunks from a completion request
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Main trait for completion providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "mock")
    fn name(&self) -> &str;

    /// Streaming completion
    ///
    /// Errors returned here happen before any chunk arrived; errors inside the
    /// stream happen mid-response.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream>;
}

/// Request for completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model to use
    pub model: String,

    /// Messages in the conversation, system prompt included
    pub messages: Vec<Message>,

    /// Tools available for the model to use (empty means no tools field)
    pub tools: Vec<ToolSchema>,

    /// How to handle tool choice (only sent alongside tools)
    pub tool_choice: ToolChoice,
}

/// One incremental event of a streaming response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    /// Sender role, usually present on the first chunk only
    pub role: Option<Role>,

    /// Text fragment
    pub content: Option<String>,

    /// Tool call fragments
    pub tool_calls: Option<Vec<ToolCallDelta>>,

    /// Why the model stopped, on the last chunk
    pub finish_reason: Option<String>,
}

/// Fragment of one tool call inside a chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallDelta {
    /// Position of the call within the response
    pub index: usize,
    /// Call id, sent with the first fragment of the call
    pub id: Option<String>,
    /// Function name, sent with the first fragment of the call
    pub name: Option<String>,
    /// Piece of the JSON argument text
    pub arguments: Option<String>,
}

/// Tool schema sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// JSON-schema object describing the arguments
    pub parameters: serde_json::Value,
}

/// How the model should choose to use tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Let the model decide
    #[default]
    Auto,
    /// Don't use any tools
    None,
    /// Must use a tool
    Required,
    /// Use a specific tool
    Specific(String),
}

impl FromStr for ToolChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "auto" => ToolChoice::Auto,
            "none" => ToolChoice::None,
            "required" => ToolChoice::Required,
            name => ToolChoice::Specific(name.to_string()),
        })
    }
}

impl std::fmt::Display for ToolChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolChoice::Auto => write!(f, "auto"),
            ToolChoice::None => write!(f, "none"),
            ToolChoice::Required => write!(f, "required"),
            ToolChoice::Specific(name) => write!(f, "{}", name),
        }
    }
}

impl CompletionRequest {
    /// Create a new completion request without tools
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: vec![],
            tool_choice: ToolChoice::Auto,
        }
    }

    /// Attach tools and the policy for choosing them
    pub fn with_tools(mut self, tools: Vec<ToolSchema>, tool_choice: ToolChoice) -> Self {
        self.tools = tools;
        self.tool_choice = tool_choice;
        self
    }

    /// Whether the request carries any tools
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

impl StreamChunk {
    /// A chunk carrying a text fragment
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// The chunk that closes a response
    pub fn finish(reason: impl Into<String>) -> Self {
        Self {
            finish_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Set the role marker
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Whether the chunk carries any tool call information
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}
