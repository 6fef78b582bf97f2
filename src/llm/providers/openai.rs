// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI-compatible API provider implementation
//!
//! Implements the LlmProvider trait for any service exposing the
//! `/chat/completions` endpoint with server-sent-event streaming.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Settings;
use crate::error::{ApiError, RelayError, Result};
use crate::llm::message::{AssistantReply, Message, Role};
use crate::llm::provider::{
    ChunkStream, CompletionRequest, LlmProvider, StreamChunk, ToolCallDelta, ToolChoice,
    ToolSchema,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Provider for OpenAI and OpenAI-compatible servers
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new provider against the public OpenAI endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, OPENAI_API_URL)
    }

    /// Create with a custom base URL (without the `/chat/completions` suffix)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a provider from settings, reading credentials from the environment
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.get_api_key().ok_or_else(|| {
            RelayError::Config(format!(
                "no API key found; set {} or provider.api_key",
                settings.provider.api_key_env
            ))
        })?;

        let client = Client::builder()
            .user_agent(format!("relay/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.provider.request_timeout_secs))
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.get_base_url().trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint the requests are posted to
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Convert internal messages to the OpenAI wire format
    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|message| match message {
                Message::System { content } | Message::User { content } => OpenAiMessage {
                    role: message.role(),
                    content: Some(content.clone()),
                    ..Default::default()
                },
                Message::Assistant(AssistantReply::Text(text)) => OpenAiMessage {
                    role: Role::Assistant,
                    content: Some(text.clone()),
                    ..Default::default()
                },
                Message::Assistant(AssistantReply::ToolCalls(calls)) => OpenAiMessage {
                    role: Role::Assistant,
                    tool_calls: Some(
                        calls
                            .iter()
                            .map(|call| OpenAiToolCall {
                                id: call.id.clone(),
                                r#type: "function".to_string(),
                                function: OpenAiFunctionCall {
                                    name: call.function.name.clone(),
                                    arguments: call.function.arguments.clone(),
                                },
                            })
                            .collect(),
                    ),
                    ..Default::default()
                },
                Message::Tool {
                    name,
                    content,
                    tool_call_id,
                } => OpenAiMessage {
                    role: Role::Tool,
                    content: Some(content.clone()),
                    name: Some(name.clone()),
                    tool_call_id: Some(tool_call_id.clone()),
                    ..Default::default()
                },
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[ToolSchema]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the request body
    fn build_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        let (tools, tool_choice) = if request.has_tools() {
            let choice = match &request.tool_choice {
                ToolChoice::Auto => OpenAiToolChoice::Auto,
                ToolChoice::None => OpenAiToolChoice::None,
                ToolChoice::Required => OpenAiToolChoice::Required,
                ToolChoice::Specific(name) => OpenAiToolChoice::Function {
                    r#type: "function".to_string(),
                    function: OpenAiFunctionName { name: name.clone() },
                },
            };
            (Some(self.convert_tools(&request.tools)), Some(choice))
        } else {
            (None, None)
        };

        OpenAiRequest {
            model: request.model.clone(),
            messages: self.convert_messages(&request.messages),
            tools,
            tool_choice,
            stream: true,
        }
    }

    /// Parse an error response
    fn parse_error(&self, status: u16, retry_after: Option<u32>, body: &str) -> RelayError {
        let (message, code) = match serde_json::from_str::<OpenAiError>(body) {
            Ok(error) => (error.error.message, error.error.code.unwrap_or_default()),
            Err(_) => (body.to_string(), String::new()),
        };

        let api_error = match (status, code.as_str()) {
            (401, _) | (403, _) | (_, "invalid_api_key") => ApiError::AuthenticationFailed,
            (404, _) | (_, "model_not_found") => ApiError::ModelNotFound(message),
            (429, _) => ApiError::RateLimited(retry_after.unwrap_or(60)),
            (500..=599, _) => ApiError::ServerError { status, message },
            _ => ApiError::BadRequest(message),
        };
        RelayError::Api(api_error)
    }
}

/// Map a transport failure from reqwest into an API error
fn transport_error(error: reqwest::Error) -> RelayError {
    if error.is_timeout() {
        RelayError::Api(ApiError::Timeout)
    } else {
        RelayError::Api(ApiError::Network(error.to_string()))
    }
}

/// Convert one decoded SSE payload into a chunk
fn convert_chunk(chunk: OpenAiStreamChunk) -> Option<StreamChunk> {
    let choice = chunk.choices.into_iter().next()?;
    let delta = choice.delta;

    let tool_calls = delta.tool_calls.map(|calls| {
        calls
            .into_iter()
            .map(|tc| {
                let (name, arguments) = match tc.function {
                    Some(function) => (function.name, function.arguments),
                    None => (None, None),
                };
                ToolCallDelta {
                    index: tc.index.unwrap_or(0),
                    id: tc.id,
                    name,
                    arguments,
                }
            })
            .collect()
    });

    Some(StreamChunk {
        role: delta.role,
        content: delta.content,
        tool_calls,
        finish_reason: choice.finish_reason,
    })
}

/// Split buffered SSE bytes into complete lines and decode the `data:` ones.
///
/// Only complete lines are decoded, so a character split across two network
/// reads stays intact. Returns the decoded chunks and whether the terminal
/// `[DONE]` marker was seen.
fn drain_sse_lines(buffer: &mut Vec<u8>) -> (Vec<Result<StreamChunk>>, bool) {
    let mut events = Vec::new();

    while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=line_end).collect();
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!(
                    target: "relay.llm.openai",
                    error = %e,
                    "skipping stream line that is not valid UTF-8"
                );
                continue;
            }
        };

        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
            continue;
        };

        if data == "[DONE]" {
            return (events, true);
        }

        match serde_json::from_str::<OpenAiStreamChunk>(data) {
            Ok(chunk) => {
                if let Some(chunk) = convert_chunk(chunk) {
                    events.push(Ok(chunk));
                }
            }
            Err(e) => {
                // Mid-stream error objects arrive as data lines too
                if let Ok(error) = serde_json::from_str::<OpenAiError>(data) {
                    events.push(Err(RelayError::Api(ApiError::StreamError(
                        error.error.message,
                    ))));
                    return (events, true);
                }
                tracing::warn!(
                    target: "relay.llm.openai",
                    error = %e,
                    "skipping undecodable stream line"
                );
            }
        }
    }

    (events, false)
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        let body = self.build_request(&request);

        tracing::debug!(
            target: "relay.llm.openai",
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.as_ref().map_or(0, Vec::len),
            "sending streaming completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status, retry_after, &body));
        }

        // State: (line buffer, [DONE] seen)
        let chunk_stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| RelayError::Api(ApiError::StreamError(e.to_string()))))
            .scan((Vec::new(), false), |state, result| {
                let (buffer, done) = state;
                if *done {
                    return futures::future::ready(None);
                }

                let bytes = match result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        *done = true;
                        return futures::future::ready(Some(vec![Err(e)]));
                    }
                };
                buffer.extend_from_slice(&bytes);

                let (events, finished) = drain_sse_lines(buffer);
                *done = finished;
                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(chunk_stream))
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<OpenAiToolChoice>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl Default for OpenAiMessage {
    fn default() -> Self {
        Self {
            role: Role::User,
            content: None,
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    r#type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug)]
enum OpenAiToolChoice {
    Auto,
    None,
    Required,
    Function {
        r#type: String,
        function: OpenAiFunctionName,
    },
}

impl Serialize for OpenAiToolChoice {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            OpenAiToolChoice::Auto => serializer.serialize_str("auto"),
            OpenAiToolChoice::None => serializer.serialize_str("none"),
            OpenAiToolChoice::Required => serializer.serialize_str("required"),
            OpenAiToolChoice::Function { r#type, function } => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", r#type)?;
                map.serialize_entry("function", function)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiFunctionName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

// Streaming types
#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamDelta {
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: Option<usize>,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::ToolCall;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::with_base_url("sk-test", "http://localhost:8080/v1/")
    }

    fn weather_schema() -> ToolSchema {
        ToolSchema {
            name: "get_current_weather".to_string(),
            description: "Get the current weather".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }),
        }
    }

    #[test]
    fn test_provider_name_and_endpoint() {
        let provider = provider();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(
            OpenAiProvider::new("k").endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_from_settings_requires_api_key() {
        let mut settings = Settings::default();
        settings.provider.api_key_env = "RELAY_TEST_NO_SUCH_KEY".to_string();
        assert!(matches!(
            OpenAiProvider::from_settings(&settings),
            Err(RelayError::Config(_))
        ));

        settings.provider.api_key = Some("sk-file".to_string());
        assert!(OpenAiProvider::from_settings(&settings).is_ok());
    }

    #[test]
    fn test_build_request_without_tools_omits_tool_fields() {
        let request = CompletionRequest::new("gpt-4o", vec![Message::user("Hello")]);
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], true);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
    }

    #[test]
    fn test_build_request_with_tools() {
        let request = CompletionRequest::new("gpt-4o", vec![Message::user("Weather?")])
            .with_tools(vec![weather_schema()], ToolChoice::Auto);
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_current_weather");
        assert_eq!(
            body["tools"][0]["function"]["parameters"]["required"][0],
            "location"
        );
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn test_tool_choice_serialization() {
        let request = CompletionRequest::new("gpt-4o", vec![]).with_tools(
            vec![weather_schema()],
            ToolChoice::Specific("get_current_weather".to_string()),
        );
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();
        assert_eq!(body["tool_choice"]["type"], "function");
        assert_eq!(
            body["tool_choice"]["function"]["name"],
            "get_current_weather"
        );
    }

    #[test]
    fn test_convert_tool_round_messages() {
        let call = ToolCall::new("call_1", "get_location", "{}");
        let messages = vec![
            Message::system("be brief"),
            Message::assistant_tool_calls(vec![call]).unwrap(),
            Message::tool("get_location", "beijing", "call_1"),
        ];
        let wire = serde_json::to_value(provider().convert_messages(&messages)).unwrap();

        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "assistant");
        assert!(wire[1].get("content").is_none());
        assert_eq!(wire[1]["tool_calls"][0]["id"], "call_1");
        assert_eq!(wire[1]["tool_calls"][0]["type"], "function");
        assert_eq!(wire[1]["tool_calls"][0]["function"]["arguments"], "{}");
        assert_eq!(wire[2]["role"], "tool");
        assert_eq!(wire[2]["name"], "get_location");
        assert_eq!(wire[2]["tool_call_id"], "call_1");
        assert_eq!(wire[2]["content"], "beijing");
    }

    #[test]
    fn test_parse_error_mapping() {
        let p = provider();
        let body = r#"{"error": {"message": "Incorrect API key", "code": "invalid_api_key"}}"#;
        assert!(matches!(
            p.parse_error(401, None, body),
            RelayError::Api(ApiError::AuthenticationFailed)
        ));
        assert!(matches!(
            p.parse_error(429, Some(7), "{}"),
            RelayError::Api(ApiError::RateLimited(7))
        ));
        assert!(matches!(
            p.parse_error(429, None, "{}"),
            RelayError::Api(ApiError::RateLimited(60))
        ));
        assert!(matches!(
            p.parse_error(404, None, r#"{"error": {"message": "no such model"}}"#),
            RelayError::Api(ApiError::ModelNotFound(m)) if m == "no such model"
        ));
        assert!(matches!(
            p.parse_error(503, None, "upstream down"),
            RelayError::Api(ApiError::ServerError { status: 503, .. })
        ));
        assert!(matches!(
            p.parse_error(400, None, r#"{"error": {"message": "bad tools"}}"#),
            RelayError::Api(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_drain_sse_lines_text() {
        let mut buffer = b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n\
             data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
             data: {\"choices\":[{\"delta\":{\"con"
            .to_vec();
        let (events, done) = drain_sse_lines(&mut buffer);
        assert!(!done);
        assert_eq!(events.len(), 2);
        let first = events[0].as_ref().unwrap();
        assert_eq!(first.role, Some(Role::Assistant));
        assert_eq!(events[1].as_ref().unwrap().content.as_deref(), Some("Hi"));
        // Incomplete line stays buffered
        assert!(buffer.starts_with(b"data: {\"choices\""));
    }

    #[test]
    fn test_drain_sse_lines_tool_call_and_done() {
        let mut buffer = Vec::from(
            ": keep-alive\n\
             data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"get_location\",\"arguments\":\"\"}}]}}]}\n\
             data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\
             data: [DONE]\n\
             data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
        );
        let (events, done) = drain_sse_lines(&mut buffer);
        assert!(done);
        assert_eq!(events.len(), 2);

        let first = events[0].as_ref().unwrap();
        let delta = &first.tool_calls.as_ref().unwrap()[0];
        assert_eq!(delta.index, 0);
        assert_eq!(delta.id.as_deref(), Some("call_1"));
        assert_eq!(delta.name.as_deref(), Some("get_location"));

        let last = events[1].as_ref().unwrap();
        assert_eq!(last.finish_reason.as_deref(), Some("tool_calls"));
        assert!(last.content.is_none());
    }

    #[test]
    fn test_drain_sse_lines_error_payload() {
        let mut buffer =
            Vec::from("data: {\"error\":{\"message\":\"overloaded\",\"code\":null}}\n");
        let (events, done) = drain_sse_lines(&mut buffer);
        assert!(done);
        assert!(matches!(
            events[0],
            Err(RelayError::Api(ApiError::StreamError(_)))
        ));
    }

    #[test]
    fn test_chunk_without_choices_is_skipped() {
        let mut buffer = Vec::from("data: {\"choices\":[]}\n");
        let (events, done) = drain_sse_lines(&mut buffer);
        assert!(!done);
        assert!(events.is_empty());
    }

    #[test]
    fn test_character_split_across_reads_is_kept() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"晴天\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b >= 0x80).unwrap() + 1;

        let mut buffer = line[..split].to_vec();
        let (events, _) = drain_sse_lines(&mut buffer);
        assert!(events.is_empty());

        buffer.extend_from_slice(&line[split..]);
        let (events, done) = drain_sse_lines(&mut buffer);
        assert!(!done);
        assert_eq!(events[0].as_ref().unwrap().content.as_deref(), Some("晴天"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut buffer = b"data: \xff\xfe\n".to_vec();
        buffer.extend_from_slice(b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n");
        let (events, _) = drain_sse_lines(&mut buffer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().content.as_deref(), Some("ok"));
    }
}
