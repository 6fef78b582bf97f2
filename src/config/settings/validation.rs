// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{RelayError, Result};

use super::Settings;

impl Settings {
    /// Get the API key, checking the configured env var first.
    pub fn get_api_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.provider.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.provider.api_key.clone())
    }

    /// Get the base URL, checking the configured env var first.
    ///
    /// An empty `base_url_env` disables the environment override.
    pub fn get_base_url(&self) -> String {
        // Priority: env var > config file.
        if self.provider.base_url_env.is_empty() {
            return self.provider.base_url.clone();
        }
        std::env::var(&self.provider.base_url_env)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.provider.base_url.clone())
    }

    /// Reject settings that cannot drive a conversation.
    pub fn validate(&self) -> Result<()> {
        if self.provider.default_model.trim().is_empty() {
            return Err(RelayError::Config(
                "provider.default_model must not be empty".to_string(),
            ));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(RelayError::Config(
                "provider.base_url must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.resilience.jitter) {
            return Err(RelayError::Config(format!(
                "resilience.jitter must be between 0.0 and 1.0, got {}",
                self.resilience.jitter
            )));
        }
        if self.resilience.base_delay_ms > self.resilience.max_delay_ms {
            return Err(RelayError::Config(
                "resilience.base_delay_ms must not exceed resilience.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}
