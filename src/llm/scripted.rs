//! In-memory LLM stub for tests: replays queued responses and records every request.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, LlmError};

type Reply = Result<Option<String>, LlmError>;

#[derive(Clone, Default)]
pub(crate) struct ScriptedClient {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_text(&self, text: impl Into<String>) {
        self.push_response(Some(text.into()));
    }

    pub(crate) fn push_response(&self, content: Option<String>) {
        self.replies.lock().unwrap().push_back(Ok(content));
    }

    pub(crate) fn push_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat_completion(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network_error("script exhausted".to_string())));
        reply.map(|content| ChatResponse {
            content,
            usage: None,
        })
    }
}
