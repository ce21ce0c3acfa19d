//! Offline model that replays canned replies.

use async_trait::async_trait;
use quill_core::error::{QuillError, Result};
use quill_core::llm::{LanguageModel, ModelReply};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Replies from per-persona queues, then from a fallback reply.
///
/// Every prompt it receives is recorded, so tests can inspect what each
/// persona was shown.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    queues: Mutex<HashMap<String, VecDeque<Result<String>>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model that answers every call with `reply`.
    pub fn echoing(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Queues a reply for `persona_id`.
    pub async fn push_reply(&self, persona_id: &str, reply: impl Into<String>) {
        self.queues
            .lock()
            .await
            .entry(persona_id.to_string())
            .or_default()
            .push_back(Ok(reply.into()));
    }

    /// Queues a failure for `persona_id`.
    pub async fn push_failure(&self, persona_id: &str, message: impl Into<String>) {
        let error = QuillError::model(persona_id, message);
        self.queues
            .lock()
            .await
            .entry(persona_id.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// `(persona_id, prompt)` pairs in call order.
    pub async fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn send(&self, prompt: &str, persona_id: &str) -> Result<ModelReply> {
        self.prompts
            .lock()
            .await
            .push((persona_id.to_string(), prompt.to_string()));

        let queued = self
            .queues
            .lock()
            .await
            .get_mut(persona_id)
            .and_then(|queue| queue.pop_front());

        match queued {
            Some(reply) => reply.map(ModelReply::new),
            None => self
                .fallback
                .clone()
                .map(ModelReply::new)
                .ok_or_else(|| QuillError::model(persona_id, "no scripted reply left")),
        }
    }
}
