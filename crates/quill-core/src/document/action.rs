use super::range::TextRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an action does to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Register a pending change without touching visible text.
    Suggest,
    /// Commit a change at the computed range.
    Apply,
    /// Synthesize and open a new document.
    Create,
    /// Commit content incrementally from a start position.
    Stream,
    /// Restore the previous recorded state.
    Rollback,
}

impl ActionKind {
    /// Parses the `type` field of a structured reply (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "suggest" | "suggestion" => Some(Self::Suggest),
            "apply" | "edit" => Some(Self::Apply),
            "create" => Some(Self::Create),
            "stream" => Some(Self::Stream),
            "rollback" | "undo" => Some(Self::Rollback),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggest => "suggest",
            Self::Apply => "apply",
            Self::Create => "create",
            Self::Stream => "stream",
            Self::Rollback => "rollback",
        }
    }

    /// Whether executing this kind changes visible document text.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Suggest)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed instruction interpreted from a persona's reply.
///
/// Produced only by the response interpreter and consumed only by the
/// action executor. It is never persisted on its own; the executor echoes
/// its content and reasoning into a system message for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAction {
    pub kind: ActionKind,
    pub target_document_id: Option<String>,
    pub content: Option<String>,
    pub reasoning: Option<String>,
    pub range: Option<TextRange>,
    pub origin_agent_id: String,
}

impl DocumentAction {
    pub fn new(kind: ActionKind, origin_agent_id: impl Into<String>) -> Self {
        Self {
            kind,
            target_document_id: None,
            content: None,
            reasoning: None,
            range: None,
            origin_agent_id: origin_agent_id.into(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_range(mut self, range: TextRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_target(mut self, document_id: impl Into<String>) -> Self {
        self.target_document_id = Some(document_id.into());
        self
    }
}
