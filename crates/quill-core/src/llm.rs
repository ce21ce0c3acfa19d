//! Language-model collaborator trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text returned by the language-model service for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    pub text: String,
}

impl ModelReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A language-model inference service.
///
/// A rejected call surfaces as `Err`; the orchestrator converts it into a
/// system-visible message and keeps going with the remaining turns.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn send(&self, prompt: &str, persona_id: &str) -> Result<ModelReply>;
}
