// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use tempfile::TempDir;

use relay::chat::ChatConfig;
use relay::config::Settings;
use relay::error::RelayError;
use relay::llm::provider::ToolChoice;

#[test]
fn test_settings_default_values() {
    let settings = Settings::default();

    assert_eq!(settings.provider.default_model, "gpt-4-1106-preview");
    assert_eq!(settings.provider.request_timeout_secs, 120);
    assert_eq!(settings.resilience.base_delay_ms, 1000);
    assert_eq!(settings.conversation.max_tool_rounds, 16);
}

#[test]
fn test_settings_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut settings = Settings::default();
    settings.conversation.tool_choice = "get_location".to_string();
    settings.resilience.max_attempts = 5;
    settings.save_to(&path).unwrap();

    let loaded = Settings::load_from(&path).unwrap();
    assert_eq!(loaded, settings);

    let config = ChatConfig::from_settings(&loaded);
    assert_eq!(
        config.tool_choice,
        ToolChoice::Specific("get_location".to_string())
    );
    assert_eq!(config.retry.max_attempts, 5);
}

#[test]
fn test_invalid_settings_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"resilience": {"jitter": 3.0}}"#).unwrap();

    assert!(matches!(
        Settings::load_from(&path),
        Err(RelayError::Config(_))
    ));
}

#[test]
fn test_unknown_fields_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"provider": {"organization": "acme"}}"#).unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.provider.base_url, "https://api.openai.com/v1");
}
