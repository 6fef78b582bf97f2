// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool system for relay
//!
//! Tools are named callables the model may ask to run. Each one declares its
//! parameters; the registry derives the schema sent to the model from them and
//! executes calls by name. Failures are returned as text so they can be fed
//! back into the conversation.

pub mod args;
pub mod builtin;
pub mod definition;
pub mod function;

pub use args::ToolArgs;
pub use definition::*;
pub use function::FunctionTool;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::{RelayError, Result};
use crate::llm::message::ToolCall;
use crate::llm::provider::ToolSchema;

/// Result of tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// The tool call this result answers
    pub tool_call_id: String,
    /// Name of the tool that was asked for
    pub name: String,
    /// The output of the tool
    pub output: ToolOutput,
}

/// Output from a tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Successful output
    Success(String),
    /// Rendered failure
    Error(String),
}

impl ToolResult {
    /// Create a successful result
    pub fn success(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            output: ToolOutput::Success(output.into()),
        }
    }

    /// Create an error result
    pub fn error(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            output: ToolOutput::Error(error.into()),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self.output, ToolOutput::Error(_))
    }

    /// Get the output text
    pub fn output_text(&self) -> &str {
        match &self.output {
            ToolOutput::Success(s) => s,
            ToolOutput::Error(s) => s,
        }
    }
}

/// Trait for implementing tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the tool registers under unless another is given
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// Declared parameters
    fn parameters(&self) -> Vec<ParamSpec> {
        vec![]
    }

    /// Run the tool with defaults already filled in
    async fn call(&self, args: &ToolArgs) -> anyhow::Result<String>;
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    params: Vec<ParamSpec>,
    schema: ToolSchema,
}

/// Registry of available tools
///
/// Names are unique. Registering a name again replaces the earlier tool but
/// keeps its position, so the schema list stays in first-registration order.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.register_arc(name, Arc::new(tool));
    }

    /// Register a tool under an explicit name
    pub fn register_as(&mut self, name: impl Into<String>, tool: impl Tool + 'static) {
        self.register_arc(name.into(), Arc::new(tool));
    }

    /// Register a shared tool under an explicit name
    pub fn register_arc(&mut self, name: String, tool: Arc<dyn Tool>) {
        let params = tool.parameters();
        let schema = build_schema(&name, tool.description(), &params);
        let entry = RegisteredTool {
            tool,
            params,
            schema,
        };

        match self.index.get(&name) {
            Some(&position) => {
                tracing::debug!(target: "relay.tools", tool = %name, "replacing registered tool");
                self.entries[position] = entry;
            }
            None => {
                tracing::debug!(target: "relay.tools", tool = %name, "registered tool");
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.entries[i].tool)
    }

    /// Whether a tool is registered under the name
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Schemas of all tools, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.entries.iter().map(|e| e.schema.clone()).collect()
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.schema.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execute a tool by name, returning its output or the typed failure
    pub async fn try_invoke(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        let position = *self
            .index
            .get(name)
            .ok_or_else(|| RelayError::ToolNotFound(name.to_string()))?;
        let entry = &self.entries[position];

        let args = ToolArgs::prepare(arguments, &entry.params)?;

        // A panicking tool fails its own call, not the conversation
        match AssertUnwindSafe(entry.tool.call(&args)).catch_unwind().await {
            Ok(result) => {
                result.map_err(|e| RelayError::tool_execution(name, format!("{:#}", e)))
            }
            Err(payload) => Err(RelayError::tool_execution(
                name,
                format!("panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }

    /// Execute a tool call requested by the model.
    ///
    /// Never fails: unknown tools, undecodable arguments and tool errors are
    /// rendered into an error result.
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let name = call.function.name.as_str();

        let outcome = match call.parse_arguments() {
            Ok(arguments) => self.try_invoke(name, arguments).await,
            Err(e) => Err(RelayError::InvalidInput(format!(
                "arguments are not a JSON object: {}",
                e
            ))),
        };

        match outcome {
            Ok(output) => {
                tracing::debug!(
                    target: "relay.tools",
                    tool = name,
                    call_id = %call.id,
                    bytes = output.len(),
                    "tool succeeded"
                );
                ToolResult::success(&call.id, name, output)
            }
            Err(error) => {
                tracing::warn!(
                    target: "relay.tools",
                    tool = name,
                    call_id = %call.id,
                    error = %error,
                    "tool failed"
                );
                ToolResult::error(&call.id, name, error.to_string())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
