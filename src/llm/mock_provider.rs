// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock LLM provider for testing
//!
//! Provides a scripted implementation of the LlmProvider trait that can be
//! used in tests and offline runs without making real API calls. Each call
//! consumes the next scripted response; once the script is exhausted the last
//! response is repeated.

use async_trait::async_trait;
use futures::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ApiError, RelayError, Result};
use crate::llm::message::Role;
use crate::llm::provider::{
    ChunkStream, CompletionRequest, LlmProvider, StreamChunk, ToolCallDelta,
};

/// Size of the text pieces a scripted response is split into
const CHUNK_CHARS: usize = 10;

/// A scripted LLM provider
#[derive(Clone)]
pub struct MockProvider {
    /// Provider name
    name: String,
    /// Scripted responses
    responses: Arc<Mutex<Vec<MockResponse>>>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// One scripted reply
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Stream a text answer
    Text(String),
    /// Stream a tool-call request
    ToolCalls(Vec<MockToolCall>),
    /// Fail the request before any chunk is sent
    Fail(MockFailure),
    /// Open a stream that ends before its first chunk
    Empty,
    /// Stream part of a text answer, then fail mid-response
    Interrupted { partial: String },
}

/// A scripted tool call
#[derive(Clone, Debug)]
pub struct MockToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Argument text, sent verbatim
    pub arguments: String,
}

/// Transport failures a script can produce
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockFailure {
    Network,
    Timeout,
    RateLimited,
    ServerError,
    AuthenticationFailed,
}

impl MockFailure {
    fn into_error(self) -> RelayError {
        let api = match self {
            MockFailure::Network => ApiError::Network("connection reset by peer".to_string()),
            MockFailure::Timeout => ApiError::Timeout,
            MockFailure::RateLimited => ApiError::RateLimited(1),
            MockFailure::ServerError => ApiError::ServerError {
                status: 503,
                message: "service unavailable".to_string(),
            },
            MockFailure::AuthenticationFailed => ApiError::AuthenticationFailed,
        };
        RelayError::Api(api)
    }
}

impl MockToolCall {
    /// Create a tool call with a generated id
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            arguments: arguments.to_string(),
        }
    }

    /// Create a tool call with a fixed id and raw argument text
    pub fn raw(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mock provider lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl MockProvider {
    /// Create a new mock provider answering "Mock response"
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            responses: Arc::new(Mutex::new(vec![MockResponse::Text(
                "Mock response".to_string(),
            )])),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Create a mock provider with a custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.name = name.into();
        provider
    }

    /// Replace the script with a single text response
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.with_script(vec![MockResponse::Text(text.into())])
    }

    /// Replace the script with a single tool call
    pub fn with_tool_call(self, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        self.with_script(vec![MockResponse::ToolCalls(vec![MockToolCall::new(
            name, arguments,
        )])])
    }

    /// Replace the script (responses are returned in order)
    pub fn with_script(self, script: Vec<MockResponse>) -> Self {
        *lock(&self.responses) = script;
        self
    }

    /// Append a response to the script
    pub fn then(self, response: MockResponse) -> Self {
        lock(&self.responses).push(response);
        self
    }

    /// Get the number of times complete_stream() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        lock(&self.recorded_requests).clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<CompletionRequest> {
        lock(&self.recorded_requests).last().cloned()
    }

    /// Reset call count and recorded requests
    pub fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        lock(&self.recorded_requests).clear();
    }

    /// Get the next response
    fn next_response(&self) -> Option<MockResponse> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let responses = lock(&self.responses);
        if responses.is_empty() {
            None
        } else {
            Some(responses[count.min(responses.len() - 1)].clone())
        }
    }
}

fn split(text: &str) -> Vec<String> {
    text.chars()
        .collect::<Vec<_>>()
        .chunks(CHUNK_CHARS)
        .map(|piece| piece.iter().collect())
        .collect()
}

fn text_chunks(text: &str) -> Vec<StreamChunk> {
    let mut chunks = vec![StreamChunk::text("").with_role(Role::Assistant)];
    chunks.extend(split(text).into_iter().map(StreamChunk::text));
    chunks
}

fn tool_call_chunks(calls: &[MockToolCall]) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    for (index, call) in calls.iter().enumerate() {
        chunks.push(StreamChunk {
            role: Some(Role::Assistant),
            tool_calls: Some(vec![ToolCallDelta {
                index,
                id: Some(call.id.clone()),
                name: Some(call.name.clone()),
                arguments: Some(String::new()),
            }]),
            ..Default::default()
        });
        for piece in split(&call.arguments) {
            chunks.push(StreamChunk {
                tool_calls: Some(vec![ToolCallDelta {
                    index,
                    arguments: Some(piece),
                    ..Default::default()
                }]),
                ..Default::default()
            });
        }
    }
    chunks
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        lock(&self.recorded_requests).push(request);

        let events: Vec<Result<StreamChunk>> = match self.next_response() {
            None | Some(MockResponse::Empty) => vec![],
            Some(MockResponse::Fail(failure)) => return Err(failure.into_error()),
            Some(MockResponse::Text(text)) => {
                let mut chunks = text_chunks(&text);
                chunks.push(StreamChunk::finish("stop"));
                chunks.into_iter().map(Ok).collect()
            }
            Some(MockResponse::ToolCalls(calls)) => {
                let mut chunks = tool_call_chunks(&calls);
                chunks.push(StreamChunk::finish("tool_calls"));
                chunks.into_iter().map(Ok).collect()
            }
            Some(MockResponse::Interrupted { partial }) => {
                let mut events: Vec<Result<StreamChunk>> =
                    text_chunks(&partial).into_iter().map(Ok).collect();
                events.push(Err(RelayError::Api(ApiError::StreamError(
                    "connection closed mid-response".to_string(),
                ))));
                events
            }
        };

        Ok(Box::pin(stream::iter(events)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Message;
    use futures::StreamExt;

    async fn collect(provider: &MockProvider) -> Result<Vec<Result<StreamChunk>>> {
        let stream = provider
            .complete_stream(CompletionRequest::new("mock-model", vec![Message::user("hi")]))
            .await?;
        Ok(stream.collect().await)
    }

    #[test]
    fn test_mock_provider_creation() {
        let provider = MockProvider::new();
        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_with_name() {
        let provider = MockProvider::with_name("test-provider");
        assert_eq!(provider.name(), "test-provider");
    }

    #[tokio::test]
    async fn test_text_response_is_chunked() {
        let provider = MockProvider::new().with_response("Hello from the mock provider");
        let events = collect(&provider).await.unwrap();

        let text: String = events
            .iter()
            .filter_map(|e| e.as_ref().ok())
            .filter_map(|c| c.content.clone())
            .collect();
        assert_eq!(text, "Hello from the mock provider");
        // role chunk + 3 pieces + finish
        assert_eq!(events.len(), 5);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_response() {
        let provider = MockProvider::new().with_script(vec![MockResponse::ToolCalls(vec![
            MockToolCall::raw("call_1", "get_location", "{}"),
        ])]);
        let events = collect(&provider).await.unwrap();
        let first = events[0].as_ref().unwrap();
        assert!(first.has_tool_calls());
        let delta = &first.tool_calls.as_ref().unwrap()[0];
        assert_eq!(delta.id.as_deref(), Some("call_1"));
        assert_eq!(delta.name.as_deref(), Some("get_location"));
    }

    #[tokio::test]
    async fn test_script_advances_then_repeats_last() {
        let provider = MockProvider::new().with_script(vec![
            MockResponse::Fail(MockFailure::Network),
            MockResponse::Text("ok".to_string()),
        ]);
        assert!(collect(&provider).await.is_err());
        assert!(collect(&provider).await.is_ok());
        assert!(collect(&provider).await.is_ok());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_response_has_no_events() {
        let provider = MockProvider::new().with_script(vec![MockResponse::Empty]);
        assert!(collect(&provider).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_response_ends_with_error() {
        let provider = MockProvider::new().with_script(vec![MockResponse::Interrupted {
            partial: "half".to_string(),
        }]);
        let events = collect(&provider).await.unwrap();
        assert!(events.last().unwrap().is_err());
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let provider = MockProvider::new();
        collect(&provider).await.unwrap();
        let last = provider.last_request().unwrap();
        assert_eq!(last.model, "mock-model");
        assert_eq!(provider.recorded_requests().len(), 1);

        provider.reset();
        assert_eq!(provider.call_count(), 0);
        assert!(provider.recorded_requests().is_empty());
    }

    #[test]
    fn test_failure_kinds_map_to_api_errors() {
        assert!(matches!(
            MockFailure::Timeout.into_error(),
            RelayError::Api(ApiError::Timeout)
        ));
        assert!(matches!(
            MockFailure::AuthenticationFailed.into_error(),
            RelayError::Api(ApiError::AuthenticationFailed)
        ));
    }
}
