// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Closure-backed tools

use async_trait::async_trait;
use std::sync::Arc;

use super::args::ToolArgs;
use super::definition::ParamSpec;
use super::Tool;

type ToolFn = dyn Fn(&ToolArgs) -> anyhow::Result<String> + Send + Sync;

/// A tool whose behavior is a plain Rust closure
///
/// ```
/// use relay::tools::{FunctionTool, ParamSpec};
///
/// let echo = FunctionTool::new("echo", "Repeat the given text", |args| {
///     Ok(args.str("text")?.to_string())
/// })
/// .param(ParamSpec::string("text").describe("Text to repeat"));
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    func: Arc<ToolFn>,
}

impl FunctionTool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&ToolArgs) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            params: vec![],
            func: Arc::new(func),
        }
    }

    /// Declare a parameter
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("params", &self.params.len())
            .finish()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        self.params.clone()
    }

    async fn call(&self, args: &ToolArgs) -> anyhow::Result<String> {
        (self.func)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[tokio::test]
    async fn test_function_tool_calls_closure() {
        let tool = FunctionTool::new("double", "Double a number", |args| {
            Ok((args.i64("n")? * 2).to_string())
        })
        .param(ParamSpec::integer("n"));

        assert_eq!(tool.name(), "double");
        assert_eq!(tool.parameters().len(), 1);

        let args = ToolArgs::new(serde_json::json!({"n": 21}).as_object().cloned().unwrap());
        assert_eq!(tool.call(&args).await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_function_tool_error_keeps_context() {
        let tool = FunctionTool::new("fail", "Always fails", |_| {
            Err(anyhow::anyhow!("disk full")).context("writing report")
        });
        let err = tool.call(&ToolArgs::default()).await.unwrap_err();
        assert_eq!(format!("{:#}", err), "writing report: disk full");
    }
}
