//! Durable session service.
//!
//! Every mutating call follows find → update → save, and the save completes
//! before the call returns.

use quill_core::error::{QuillError, Result};
use quill_core::session::{Message, Session, SessionKind, SessionRepository};
use std::sync::Arc;

/// Session operations on top of a [`SessionRepository`].
#[derive(Clone)]
pub struct SessionStore {
    repository: Arc<dyn SessionRepository>,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// Creates, persists and returns an empty session.
    pub async fn create_session(&self, kind: SessionKind) -> Result<Session> {
        let session = Session::new(kind);
        self.repository.save(&session).await?;
        tracing::info!("[SessionStore] Created session {}", session.id);
        Ok(session)
    }

    /// Returns the session or `NotFound`.
    pub async fn get(&self, session_id: &str) -> Result<Session> {
        self.repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| QuillError::not_found("Session", session_id))
    }

    /// Appends one message and returns the updated session.
    pub async fn append(&self, session_id: &str, message: Message) -> Result<Session> {
        self.update(session_id, |session| {
            session.push(message);
            Ok(())
        })
        .await
    }

    /// Most recently updated sessions first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Session>> {
        let mut sessions = self.repository.list_all().await?;
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    /// Empties the message log, keeping identity and agent selection.
    pub async fn clear(&self, session_id: &str) -> Result<Session> {
        self.update(session_id, |session| {
            session.clear_messages();
            Ok(())
        })
        .await
    }

    /// Replaces the set of agents taking part in the session.
    pub async fn select_agents<I>(&self, session_id: &str, agent_ids: I) -> Result<Session>
    where
        I: IntoIterator<Item = String>,
    {
        let selected = agent_ids.into_iter().collect();
        self.update(session_id, |session| {
            session.selected_agent_ids = selected;
            Ok(())
        })
        .await
    }

    /// Sets the agent a single-agent session talks to.
    pub async fn set_active_agent(
        &self,
        session_id: &str,
        agent_id: Option<String>,
    ) -> Result<Session> {
        self.update(session_id, |session| {
            session.active_agent_id = agent_id;
            Ok(())
        })
        .await
    }

    /// The session the host last marked active, if it still exists.
    pub async fn active_session(&self) -> Result<Option<Session>> {
        match self.repository.get_active_session_id().await? {
            Some(id) => self.repository.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    pub async fn set_active_session(&self, session_id: &str) -> Result<()> {
        // Reject dangling pointers.
        self.get(session_id).await?;
        self.repository.set_active_session_id(session_id).await
    }

    /// Loads `session_id`, or creates a fresh session when it is absent.
    ///
    /// Only `NotFound` triggers creation; storage failures propagate.
    pub async fn get_or_create(&self, session_id: Option<&str>, kind: SessionKind) -> Result<Session> {
        if let Some(id) = session_id {
            match self.get(id).await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_not_found() => {
                    tracing::info!("[SessionStore] Session {} not found, creating a new one", id);
                }
                Err(e) => return Err(e),
            }
        }
        self.create_session(kind).await
    }

    async fn update<F>(&self, session_id: &str, updater: F) -> Result<Session>
    where
        F: FnOnce(&mut Session) -> Result<()>,
    {
        let mut session = self.get(session_id).await?;
        updater(&mut session)?;
        session.touch();
        self.repository.save(&session).await?;
        tracing::debug!(
            "[SessionStore] Saved session {} ({} messages)",
            session.id,
            session.messages.len()
        );
        Ok(session)
    }
}
