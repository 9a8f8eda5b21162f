//! LLM provider abstraction and the OpenAI-compatible implementation.

pub mod openai;
pub mod provider;

use std::time::Duration;

pub use openai::OpenAiProvider;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

use crate::error::LlmError;

/// Complete a request with a per-attempt timeout and bounded retry.
///
/// `max_retries` is the number of extra attempts after the first. Only
/// transient errors (see [`LlmError::is_retryable`]) are retried; a timed-out
/// attempt counts as transient. Attempts are spaced by a short linear backoff.
pub async fn complete_with_retry(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
    timeout: Duration,
    max_retries: u32,
) -> Result<CompletionResponse, LlmError> {
    let mut last_err: Option<LlmError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
        }

        match tokio::time::timeout(timeout, provider.complete(request.clone())).await {
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(e)) if e.is_retryable() => {
                tracing::warn!(
                    model = provider.model_name(),
                    attempt,
                    max_retries,
                    "LLM call failed (transient): {}",
                    e
                );
                last_err = Some(e);
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::warn!(
                    model = provider.model_name(),
                    attempt,
                    max_retries,
                    "LLM call timed out after {:?}",
                    timeout
                );
                last_err = Some(LlmError::Timeout {
                    provider: provider.model_name().to_string(),
                    after: timeout,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| LlmError::RequestFailed {
        provider: provider.model_name().to_string(),
        reason: "no attempts were made".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider that fails a configured number of times before succeeding.
    struct FlakyProvider {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn model_name(&self) -> &str {
            "flaky"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(LlmError::RequestFailed {
                    provider: "flaky".to_string(),
                    reason: "simulated".to_string(),
                })
            } else {
                Ok(CompletionResponse {
                    content: "ok".to_string(),
                    finish_reason: FinishReason::Stop,
                })
            }
        }
    }

    /// Provider that always fails with a non-retryable error.
    struct AuthFailProvider;

    #[async_trait]
    impl LlmProvider for AuthFailProvider {
        fn model_name(&self) -> &str {
            "authfail"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::AuthFailed {
                provider: "authfail".to_string(),
            })
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user("hi")])
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let provider = FlakyProvider {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
        };
        let response =
            complete_with_retry(&provider, request(), Duration::from_secs(1), 2).await;
        assert_eq!(response.unwrap().content, "ok");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_last_error() {
        let provider = FlakyProvider {
            failures_before_success: 10,
            calls: AtomicU32::new(0),
        };
        let response =
            complete_with_retry(&provider, request(), Duration::from_secs(1), 1).await;
        assert!(matches!(response, Err(LlmError::RequestFailed { .. })));
        // First attempt plus one retry.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_immediately() {
        let provider = AuthFailProvider;
        let response =
            complete_with_retry(&provider, request(), Duration::from_secs(1), 5).await;
        assert!(matches!(response, Err(LlmError::AuthFailed { .. })));
    }
}
