//! LLM client module for interacting with chat-completion endpoints.
//!
//! This module provides a trait-based abstraction over LLM providers,
//! with OpenRouter (or any OpenAI-compatible endpoint) as the primary implementation.
//!
//! Request ordering is always `[system?, ...history, user]`, see [`build_messages`].

mod error;
mod openrouter;
mod retry;
#[cfg(test)]
pub(crate) mod scripted;

pub use error::{classify_http_status, LlmError, LlmErrorKind, RetryConfig};
pub use openrouter::OpenRouterClient;
pub use retry::RetryingClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a simple text message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Token usage information (if provided by the upstream provider).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Optional parameters for chat completions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature (0 = deterministic).
    pub temperature: Option<f64>,
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, LlmError>;
}

/// Assemble the message list for a single completion: `[system?, ...history, user]`.
///
/// An empty system prompt is treated as absent.
pub fn build_messages(
    system_prompt: Option<&str>,
    history: &[ChatMessage],
    user_prompt: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
        messages.push(ChatMessage::system(system));
    }
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user_prompt));
    messages
}

/// A client bound to a model and sampling options.
///
/// This is the `complete(system, user, history) -> text` surface the solver talks to.
#[derive(Clone)]
pub struct ModelHandle {
    client: Arc<dyn LlmClient>,
    model: String,
    options: ChatOptions,
}

impl ModelHandle {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, options: ChatOptions) -> Self {
        Self {
            client,
            model: model.into(),
            options,
        }
    }

    /// Build an OpenRouter-backed handle from configuration, optionally with retries.
    pub fn from_config(
        config: &SolverConfig,
        retry: Option<RetryConfig>,
    ) -> Result<Self, LlmError> {
        let client = OpenRouterClient::from_config(config)?;
        let client: Arc<dyn LlmClient> = match retry {
            Some(retry) => Arc::new(RetryingClient::new(client, retry)),
            None => Arc::new(client),
        };
        let options = ChatOptions {
            temperature: Some(config.temperature),
        };
        Ok(Self::new(client, config.model.clone(), options))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one completion and return the text of the first choice.
    ///
    /// A response without content is reported as a parse error.
    pub async fn complete(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let messages = build_messages(system_prompt, history, user_prompt);
        let response = self
            .client
            .chat_completion(&self.model, &messages, &self.options)
            .await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion finished"
            );
        }
        response
            .content
            .ok_or_else(|| LlmError::parse_error("No content in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_order_with_system_prompt() {
        let history = vec![ChatMessage::user("problem"), ChatMessage::assistant("draft")];
        let messages = build_messages(Some("be rigorous"), &history, "improve it");

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[0].content, "be rigorous");
        assert_eq!(messages[3].content, "improve it");
    }

    #[test]
    fn test_empty_system_prompt_is_dropped() {
        let messages = build_messages(Some(""), &[], "yes or no?");
        assert_eq!(messages, vec![ChatMessage::user("yes or no?")]);

        let messages = build_messages(None, &[], "yes or no?");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[tokio::test]
    async fn test_model_handle_missing_content_is_parse_error() {
        let client = scripted::ScriptedClient::new();
        client.push_response(None);
        let handle = ModelHandle::new(Arc::new(client), "m", ChatOptions::default());

        let err = handle.complete(None, "hello", &[]).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ParseError);
    }
}
