// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Retry logic for LLM API calls with exponential backoff

use crate::config::settings::ResilienceConfig;
use crate::error::{ApiError, RelayError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration with smart defaults
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, the first one included
    pub max_attempts: u32,
    /// Base delay in milliseconds (exponentially increased)
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Fraction of the delay that is randomized away (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}

impl From<&ResilienceConfig> for RetryConfig {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter: config.jitter,
        }
    }
}

impl RetryConfig {
    /// Configuration that never waits, for tests and scripted providers
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: 0.0,
        }
    }

    /// Calculate the wait after a failed attempt (0-based)
    pub(crate) fn calculate_delay(&self, attempt: u32) -> Duration {
        // Exponential backoff: base * 2^attempt, capped
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let capped_ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);

        // Full jitter when jitter == 1.0: uniform in [0, capped]
        let jitter = self.jitter.clamp(0.0, 1.0);
        let jitter_range = (capped_ms as f64 * jitter) as u64;
        let jitter_ms = if jitter_range == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_range)
        };

        Duration::from_millis(capped_ms - jitter_ms)
    }
}

/// Determine if an error is retryable
pub fn is_retryable(error: &RelayError) -> bool {
    match error {
        RelayError::Api(api_error) => match api_error {
            // Retry on transient failures
            ApiError::Network(_) => true,
            ApiError::RateLimited(_) => true,
            ApiError::Timeout => true,
            ApiError::ServerError { status, .. } => (500..600).contains(status),
            ApiError::StreamError(_) => true,

            // Don't retry on client errors
            ApiError::AuthenticationFailed => false,
            ApiError::ModelNotFound(_) => false,
            ApiError::BadRequest(_) => false,
            ApiError::InvalidResponse(_) => false,
        },
        RelayError::Http(_) => true,
        _ => false,
    }
}

/// Retry an async operation with exponential backoff
///
/// # Arguments
/// * `operation` - The async operation to retry
/// * `config` - Retry configuration
/// * `operation_name` - Name of the operation for logging
///
/// # Returns
/// Result of the first successful attempt, or the last error
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(
                        target: "relay.llm.retry",
                        operation = operation_name,
                        attempts = attempt + 1,
                        "operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !is_retryable(&error) {
                    tracing::warn!(
                        target: "relay.llm.retry",
                        operation = operation_name,
                        error = %error,
                        "non-retryable failure"
                    );
                    return Err(error);
                }

                if attempt + 1 >= max_attempts {
                    tracing::warn!(
                        target: "relay.llm.retry",
                        operation = operation_name,
                        attempts = max_attempts,
                        error = %error,
                        "retries exhausted"
                    );
                    return Err(error);
                }

                let delay = config.calculate_delay(attempt);
                tracing::warn!(
                    target: "relay.llm.retry",
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed; backing off"
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
