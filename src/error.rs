// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for relay
//!
//! Transport failures live in [`ApiError`] and terminate a turn. Tool failures
//! are also expressed here, but the chat loop renders them into conversation
//! content instead of propagating them.

use thiserror::Error;

/// Main error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The completion service opened a stream but sent no events
    #[error("Completion stream ended before the first event")]
    EmptyStream,

    /// The model asked for a tool nobody registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A registered tool failed while running
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// The model kept requesting tools past the configured cap
    #[error("Tool round limit exceeded after {rounds} rounds")]
    RoundLimitExceeded { rounds: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Requested model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The service rejected the request body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Build a tool execution error
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        RelayError::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error is local to a single tool invocation
    pub fn is_tool_error(&self) -> bool {
        matches!(
            self,
            RelayError::ToolNotFound(_)
                | RelayError::ToolExecution { .. }
                | RelayError::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream_message() {
        let err = RelayError::EmptyStream;
        assert!(err.to_string().contains("before the first event"));
    }

    #[test]
    fn test_tool_not_found_names_tool() {
        let err = RelayError::ToolNotFound("get_weather".to_string());
        assert_eq!(err.to_string(), "Tool not found: get_weather");
    }

    #[test]
    fn test_tool_execution_message() {
        let err = RelayError::tool_execution("exec_code", "division by zero");
        let text = err.to_string();
        assert!(text.contains("exec_code"));
        assert!(text.contains("division by zero"));
    }

    #[test]
    fn test_round_limit_message() {
        let err = RelayError::RoundLimitExceeded { rounds: 16 };
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_is_tool_error() {
        assert!(RelayError::ToolNotFound("x".into()).is_tool_error());
        assert!(RelayError::tool_execution("x", "y").is_tool_error());
        assert!(RelayError::InvalidInput("bad".into()).is_tool_error());
        assert!(!RelayError::EmptyStream.is_tool_error());
        assert!(!RelayError::Api(ApiError::Timeout).is_tool_error());
    }

    #[test]
    fn test_relay_error_from_api_error() {
        let err: RelayError = ApiError::AuthenticationFailed.into();
        assert!(err.to_string().contains("API error"));
    }

    #[test]
    fn test_relay_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RelayError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_api_error_server_error() {
        let err = ApiError::ServerError {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn test_api_error_bad_request() {
        let err = ApiError::BadRequest("tools must be an array".to_string());
        assert!(err.to_string().starts_with("Bad request"));
    }
}
