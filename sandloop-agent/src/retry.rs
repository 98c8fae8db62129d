//! Retry policy for model calls

use sandloop_core::{CompletionRequest, CompletionResponse, Error, LlmProvider, ProviderError};
use std::time::Duration;

/// How often, and how patiently, a model call is retried.
///
/// Rate limits wait `rate_limit_backoff` between attempts. A rejected tool
/// call (`tool_use_failed`) is retried at once: the model's output is
/// non-deterministic, so the same request may simply succeed. Attempt counts
/// include the first call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub rate_limit_attempts: usize,
    pub rate_limit_backoff: Duration,
    pub tool_use_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit_attempts: 2,
            rate_limit_backoff: Duration::from_secs(30),
            tool_use_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits, for tests and local servers
    pub fn immediate() -> Self {
        Self {
            rate_limit_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Call the provider, retrying per policy.
    ///
    /// The two budgets are tracked separately. Any other provider error is
    /// returned immediately.
    pub async fn complete<P: LlmProvider>(
        &self,
        provider: &P,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, Error> {
        let mut rate_limited = 0;
        let mut tool_use_failed = 0;

        loop {
            let err = match provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            match &err {
                ProviderError::RateLimited { retry_after } => {
                    rate_limited += 1;
                    if rate_limited >= self.rate_limit_attempts {
                        tracing::warn!("rate limit retries exhausted");
                        return Err(exhausted(err, rate_limited));
                    }
                    tracing::warn!(
                        wait_secs = self.rate_limit_backoff.as_secs(),
                        ?retry_after,
                        attempt = rate_limited,
                        "rate limited, waiting before retry"
                    );
                    tokio::time::sleep(self.rate_limit_backoff).await;
                }
                ProviderError::ToolUseFailed(message) => {
                    tool_use_failed += 1;
                    if tool_use_failed >= self.tool_use_attempts {
                        tracing::warn!(%message, "tool call retries exhausted");
                        return Err(exhausted(err, tool_use_failed));
                    }
                    tracing::warn!(
                        %message,
                        attempt = tool_use_failed,
                        "model produced a malformed tool call, retrying"
                    );
                }
                _ => return Err(err.into_error()),
            }
        }
    }
}

fn exhausted(err: ProviderError, attempts: usize) -> Error {
    err.into_error()
        .with_context("attempts", attempts.to_string())
        .persist()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{text_response, ScriptedProvider};
    use sandloop_core::{ChatMessage, ErrorKind, ErrorStatus};

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user("hi")])
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("done"))]);
        let response = RetryPolicy::immediate().complete(&provider, &request()).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("done"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_exhausted() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited { retry_after: None }),
            Ok(text_response("after wait")),
        ]);
        let response = RetryPolicy::immediate().complete(&provider, &request()).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("after wait"));

        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited { retry_after: None }),
            Err(ProviderError::RateLimited { retry_after: None }),
            Ok(text_response("never reached")),
        ]);
        let err = RetryPolicy::immediate().complete(&provider, &request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.status(), ErrorStatus::Persistent);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_backoff() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited { retry_after: None }),
            Ok(text_response("ok")),
        ]);
        let started = tokio::time::Instant::now();
        RetryPolicy::default().complete(&provider, &request()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_tool_use_failed_retries_immediately() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::ToolUseFailed("bad call".into())),
            Err(ProviderError::ToolUseFailed("bad call".into())),
            Ok(text_response("third time")),
        ]);
        let response = RetryPolicy::default().complete(&provider, &request()).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("third time"));
        assert_eq!(provider.calls(), 3);

        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::ToolUseFailed("a".into())),
            Err(ProviderError::ToolUseFailed("b".into())),
            Err(ProviderError::ToolUseFailed("c".into())),
        ]);
        let err = RetryPolicy::default().complete(&provider, &request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolUseFailed);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::Api { status: 500, message: "boom".into() }),
            Ok(text_response("unused")),
        ]);
        let err = RetryPolicy::immediate().complete(&provider, &request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderFailed);
        assert_eq!(provider.calls(), 1);
    }
}
