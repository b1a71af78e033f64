//! Retrying wrapper around any [`LlmClient`].

use std::time::Instant;

use async_trait::async_trait;

use super::error::{LlmError, RetryConfig};
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient};

/// Wraps a client and re-issues failed requests according to a [`RetryConfig`].
pub struct RetryingClient<C> {
    inner: C,
    retry_config: RetryConfig,
}

impl<C: LlmClient> RetryingClient<C> {
    pub fn new(inner: C, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for RetryingClient<C> {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let start = Instant::now();
        let mut attempt = 1;

        loop {
            let error = match self.inner.chat_completion(model, messages, options).await {
                Ok(response) => {
                    if attempt > 1 {
                        tracing::info!(
                            "Request succeeded on attempt {} (total time: {:?})",
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(response);
                }
                Err(error) => error,
            };

            if !self.retry_config.should_retry(&error) {
                tracing::error!("Request failed (not retried): {}", error);
                return Err(error);
            }
            if attempt >= self.retry_config.max_attempts {
                tracing::error!(
                    "Request failed after {} attempts (total time: {:?}): {}",
                    attempt,
                    start.elapsed(),
                    error
                );
                return Err(error);
            }

            let delay = self.retry_config.delay_for();
            tracing::warn!(
                "Attempt {} failed with {}, retrying in {:?}: {}",
                attempt,
                error.kind,
                delay,
                error.message
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::llm::scripted::ScriptedClient;

    fn fast_policy() -> RetryConfig {
        RetryConfig {
            delay: Duration::from_millis(1),
            ..RetryConfig::evolution()
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = ScriptedClient::new();
        inner.push_error(LlmError::server_error(503, "busy".into()));
        inner.push_error(LlmError::parse_error("no choices".into()));
        inner.push_text("evolved");
        let client = RetryingClient::new(inner.clone(), fast_policy());

        let response = client
            .chat_completion("m", &[ChatMessage::user("go")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content.as_deref(), Some("evolved"));
        assert_eq!(inner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let inner = ScriptedClient::new();
        for _ in 0..5 {
            inner.push_error(LlmError::network_error("reset".into()));
        }
        let client = RetryingClient::new(inner.clone(), fast_policy());

        let err = client
            .chat_completion("m", &[ChatMessage::user("go")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.message, "reset");
        assert_eq!(inner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_credit_exhaustion_is_not_retried() {
        let inner = ScriptedClient::new();
        inner.push_error(LlmError::client_error(402, "out of credits".into()));
        inner.push_text("never reached");
        let client = RetryingClient::new(inner.clone(), fast_policy());

        let err = client
            .chat_completion("m", &[ChatMessage::user("go")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_payment_required());
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let inner = ScriptedClient::new();
        inner.push_error(LlmError::rate_limited("slow down".into()));
        inner.push_text("never reached");
        let client = RetryingClient::new(inner.clone(), fast_policy());

        let err = client
            .chat_completion("m", &[ChatMessage::user("go")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code, Some(429));
        assert_eq!(inner.call_count(), 1);
    }
}
