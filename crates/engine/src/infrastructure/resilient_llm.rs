//! Resilient LLM client wrapper with exponential backoff retry
//!
//! Wraps any LlmPort implementation with retry logic to handle transient failures.
//! The overall deadline is enforced by the caller, so retries only help when the
//! first attempt fails fast.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries, just the initial attempt)
    pub max_retries: u32,
    /// Base delay in milliseconds before first retry
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,
    /// Jitter factor (0.0-1.0) for randomizing delays
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 500,
            max_delay_ms: 5000,
            jitter_factor: 0.2,
        }
    }
}

/// Wrapper that adds retry logic to any LLM client
pub struct ResilientLlmClient {
    inner: Arc<dyn LlmPort>,
    config: RetryConfig,
}

impl ResilientLlmClient {
    pub fn new(inner: Arc<dyn LlmPort>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Delay for a given attempt number using exponential backoff with jitter
    fn calculate_delay(&self, attempt: u32) -> u64 {
        let base = self.config.base_delay_ms;
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.config.max_delay_ms);

        let jitter_range = (capped as f64 * self.config.jitter_factor) as i64;
        if jitter_range > 0 {
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped as i64 + jitter).max(0) as u64
        } else {
            capped
        }
    }

    fn is_retryable(error: &LlmError) -> bool {
        match error {
            LlmError::Unavailable => false,
            LlmError::Timeout => true,
            // Client errors (bad key, bad request, unknown model) will not fix themselves
            LlmError::RequestFailed(msg) => !["400", "401", "403", "404"]
                .iter()
                .any(|code| msg.starts_with(code)),
            LlmError::InvalidResponse(_) => true,
        }
    }
}

#[async_trait]
impl LlmPort for ResilientLlmClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt + 1, "LLM request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if !Self::is_retryable(&e) {
                        tracing::warn!(error = %e, "LLM request failed with non-retryable error");
                        return Err(e);
                    }

                    if attempt < self.config.max_retries {
                        let delay = self.calculate_delay(attempt + 1);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_retries = self.config.max_retries,
                            delay_ms = delay,
                            error = %e,
                            "LLM request failed, retrying..."
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }

                    last_error = Some(e);
                }
            }
        }

        let error =
            last_error.unwrap_or_else(|| LlmError::RequestFailed("Unknown error".to_string()));
        tracing::warn!(
            attempts = self.config.max_retries + 1,
            error = %error,
            "LLM request failed after all retry attempts"
        );
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::FinishReason;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Mock LLM that fails a configurable number of times before succeeding
    struct FailingMockLlm {
        failures_remaining: AtomicU32,
        error_type: LlmError,
    }

    impl FailingMockLlm {
        fn new(failure_count: u32, error: LlmError) -> Self {
            Self {
                failures_remaining: AtomicU32::new(failure_count),
                error_type: error,
            }
        }
    }

    #[async_trait]
    impl LlmPort for FailingMockLlm {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            let remaining = self.failures_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
                Err(self.error_type.clone())
            } else {
                Ok(LlmResponse {
                    content: "The torches flicker.".to_string(),
                    finish_reason: FinishReason::Stop,
                })
            }
        }
    }

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 10,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failure() {
        let mock = Arc::new(FailingMockLlm::new(1, LlmError::Timeout));
        let client = ResilientLlmClient::new(mock, fast(1));

        let result = client.generate(LlmRequest::new(vec![])).await;
        assert_eq!(result.unwrap().content, "The torches flicker.");
    }

    #[tokio::test]
    async fn fails_after_max_retries() {
        let mock = Arc::new(FailingMockLlm::new(
            10,
            LlmError::RequestFailed("503 Service Unavailable".into()),
        ));
        let mock_ref = Arc::clone(&mock);
        let client = ResilientLlmClient::new(mock, fast(2));

        assert!(client.generate(LlmRequest::new(vec![])).await.is_err());
        assert_eq!(mock_ref.failures_remaining.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn no_retry_on_auth_error_or_missing_credential() {
        for error in [
            LlmError::RequestFailed("401 Unauthorized: bad key".into()),
            LlmError::Unavailable,
        ] {
            let mock = Arc::new(FailingMockLlm::new(10, error));
            let mock_ref = Arc::clone(&mock);
            let client = ResilientLlmClient::new(mock, fast(3));

            assert!(client.generate(LlmRequest::new(vec![])).await.is_err());
            assert_eq!(mock_ref.failures_remaining.load(Ordering::SeqCst), 9);
        }
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_factor: 0.0,
        };
        let client = ResilientLlmClient::new(
            Arc::new(FailingMockLlm::new(0, LlmError::Timeout)),
            config,
        );

        assert_eq!(client.calculate_delay(1), 1000);
        assert_eq!(client.calculate_delay(2), 2000);
        assert_eq!(client.calculate_delay(5), 16000);
        assert_eq!(client.calculate_delay(6), 30000);
    }
}
