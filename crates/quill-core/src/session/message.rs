//! Conversation message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved author id for messages typed by the human user.
pub const USER_AUTHOR_ID: &str = "user";

/// Reserved author id for engine-generated messages.
pub const SYSTEM_AUTHOR_ID: &str = "system";

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Message from the user.
    User,
    /// Message from a persona.
    Agent,
    /// Engine-generated message (errors, action audit, notices).
    System,
}

/// A single immutable entry in a session's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier (UUID format)
    pub id: String,
    /// Author id: a persona id, or one of the reserved ids
    pub agent_id: String,
    /// Name shown next to the message
    pub agent_display_name: String,
    /// The content of the message.
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Message kind
    pub kind: MessageKind,
}

impl Message {
    fn new(
        agent_id: impl Into<String>,
        display_name: impl Into<String>,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            agent_display_name: display_name.into(),
            content: content.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Creates a message authored by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER_AUTHOR_ID, "You", content, MessageKind::User)
    }

    /// Creates a message authored by a persona.
    pub fn agent(
        agent_id: impl Into<String>,
        display_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(agent_id, display_name, content, MessageKind::Agent)
    }

    /// Creates an engine-generated message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SYSTEM_AUTHOR_ID, "System", content, MessageKind::System)
    }

    /// Returns true if this message was produced by the engine.
    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System
    }
}
