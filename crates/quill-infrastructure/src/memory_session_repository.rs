//! In-memory SessionRepository, for tests and ephemeral hosts.

use async_trait::async_trait;
use quill_core::error::Result;
use quill_core::repository::SessionRepository;
use quill_core::session::Session;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
    active_session_id: RwLock<Option<String>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn get_active_session_id(&self) -> Result<Option<String>> {
        Ok(self.active_session_id.read().await.clone())
    }

    async fn set_active_session_id(&self, session_id: &str) -> Result<()> {
        *self.active_session_id.write().await = Some(session_id.to_string());
        Ok(())
    }
}
