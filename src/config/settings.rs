// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for relay
//!
//! Handles loading and saving settings from ~/.relay/settings.json

use serde::{Deserialize, Serialize};

mod io;
mod validation;

/// Main settings structure, stored in ~/.relay/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Completion service configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Retry and resilience settings for API calls
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Conversation and tool loop settings
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Configuration for the OpenAI-compatible completion service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// API key (prefer the environment variable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Environment variable that overrides the base URL
    #[serde(default = "default_base_url_env")]
    pub base_url_env: String,

    /// Base URL of the API (the `/chat/completions` path is appended)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Retry and resilience settings for API calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResilienceConfig {
    /// Total attempts per request, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (cap for backoff)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Fraction of each delay that is randomized (0.0 to 1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

/// Conversation and tool loop settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationConfig {
    /// System prompt prepended to every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Tool choice policy ("auto", "none", "required" or a tool name)
    #[serde(default = "default_tool_choice")]
    pub tool_choice: String,

    /// Maximum tool rounds in one turn (0 disables the cap)
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url_env: default_base_url_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            tool_choice: default_tool_choice(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url_env() -> String {
    "OPENAI_BASE_URL".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4-1106-preview".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

// Resilience config defaults
fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    40_000
}

fn default_jitter() -> f64 {
    1.0
}

fn default_tool_choice() -> String {
    "auto".to_string()
}

fn default_max_tool_rounds() -> usize {
    16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(settings.provider.base_url, "https://api.openai.com/v1");
        assert_eq!(settings.resilience.max_attempts, 3);
        assert_eq!(settings.resilience.max_delay_ms, 40_000);
        assert_eq!(settings.conversation.tool_choice, "auto");
        assert_eq!(settings.conversation.max_tool_rounds, 16);
        assert!(settings.conversation.system_prompt.is_none());
    }

    #[test]
    fn test_settings_partial_json_fills_defaults() {
        let json = r#"{"provider": {"default_model": "gpt-4o-mini"}, "conversation": {"max_tool_rounds": 4}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.provider.default_model, "gpt-4o-mini");
        assert_eq!(settings.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(settings.conversation.max_tool_rounds, 4);
        assert_eq!(settings.resilience, ResilienceConfig::default());
    }

    #[test]
    fn test_settings_api_key_not_serialized_when_absent() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert!(value["provider"].get("api_key").is_none());
    }
}
