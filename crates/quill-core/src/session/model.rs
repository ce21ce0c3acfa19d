//! Session domain model.

use super::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whether a session talks to one persona or to the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    SingleAgent,
    #[default]
    MultiAgent,
}

/// The durable unit of conversation state.
///
/// A session contains:
/// - The ordered message log (insertion order is the only ordering guarantee)
/// - The personas selected for this conversation surface
/// - The persona currently in focus
/// - Timestamps for creation and last update
///
/// This is the "pure" domain model that business logic operates on,
/// independent of any specific storage format or version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Human-readable session title
    pub title: String,
    /// Single- or multi-agent conversation
    pub kind: SessionKind,
    /// Message log in insertion order
    pub messages: Vec<Message>,
    /// Personas selected for this session
    pub selected_agent_ids: BTreeSet<String>,
    /// Persona currently in focus, if any
    pub active_agent_id: Option<String>,
    /// Timestamp when the session was created
    pub created_at: DateTime<Utc>,
    /// Timestamp when the session was last mutated
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session with a fresh id.
    pub fn new(kind: SessionKind) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        Self {
            title: format!("Session {}", &id[..8]),
            id,
            kind,
            messages: Vec::new(),
            selected_agent_ids: BTreeSet::new(),
            active_agent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a message and bumps `updated_at`.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Empties the message log, keeping identity and agent selection.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.touch();
    }

    /// Returns the last `limit` messages that were not produced by the engine.
    pub fn conversation_tail(&self, limit: usize) -> Vec<&Message> {
        let mut tail: Vec<&Message> = self
            .messages
            .iter()
            .rev()
            .filter(|m| !m.is_system())
            .take(limit)
            .collect();
        tail.reverse();
        tail
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
