//! Session DTOs and the session migrator.

use chrono::{DateTime, Utc};
use quill_core::error::{QuillError, Result};
use quill_core::session::{Message, MessageKind, Session, SessionKind};
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, Migrator, Versioned};

/// Entity name the session path is registered under.
pub const SESSION_ENTITY: &str = "session";

/// V1.0.0 message record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecordV1 {
    pub id: String,
    pub agent_id: String,
    pub agent_display_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

/// V1.0.0 session file layout. The `version` key is written by the migrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct SessionRecordV1 {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_agent_id: Option<String>,
    #[serde(default)]
    pub selected_agent_ids: Vec<String>,
    #[serde(default)]
    pub messages: Vec<MessageRecordV1>,
}

impl From<Message> for MessageRecordV1 {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            agent_id: message.agent_id,
            agent_display_name: message.agent_display_name,
            content: message.content,
            timestamp: message.timestamp,
            kind: message.kind,
        }
    }
}

impl From<MessageRecordV1> for Message {
    fn from(record: MessageRecordV1) -> Self {
        Self {
            id: record.id,
            agent_id: record.agent_id,
            agent_display_name: record.agent_display_name,
            content: record.content,
            timestamp: record.timestamp,
            kind: record.kind,
        }
    }
}

impl IntoDomain<Session> for SessionRecordV1 {
    fn into_domain(self) -> Session {
        Session {
            id: self.id,
            title: self.title,
            kind: self.kind,
            messages: self.messages.into_iter().map(Message::from).collect(),
            selected_agent_ids: self.selected_agent_ids.into_iter().collect(),
            active_agent_id: self.active_agent_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl FromDomain<Session> for SessionRecordV1 {
    fn from_domain(session: Session) -> Self {
        Self {
            id: session.id,
            title: session.title,
            kind: session.kind,
            created_at: session.created_at,
            updated_at: session.updated_at,
            active_agent_id: session.active_agent_id,
            selected_agent_ids: session.selected_agent_ids.into_iter().collect(),
            messages: session.messages.into_iter().map(MessageRecordV1::from).collect(),
        }
    }
}

/// Builds the migrator for session files.
///
/// # Migration Path
///
/// - V1.0.0 → Session
///
/// A file whose `version` has no registered path is rejected rather than
/// read as the current layout.
pub fn create_session_migrator() -> Result<Migrator> {
    let mut migrator = Migrator::builder().build();
    let path = Migrator::define(SESSION_ENTITY)
        .from::<SessionRecordV1>()
        .into_with_save::<Session>();
    migrator
        .register(path)
        .map_err(|e| QuillError::migration(format!("cannot register session path: {}", e)))?;
    Ok(migrator)
}
