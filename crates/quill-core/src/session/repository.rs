//! Where sessions live between runs.

use super::model::Session;
use crate::error::Result;
use async_trait::async_trait;

/// Storage for [`Session`]s and the host's active-session pointer.
///
/// The engine only talks to this trait; TOML files and in-memory maps are
/// interchangeable behind it.
///
/// # Implementation Notes
///
/// `save` must be durable when it returns: a process restart immediately
/// afterwards must observe the saved state. Storage failures are returned,
/// never swallowed.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Saves a session to storage, replacing any previous version.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Deletes a session from storage.
    ///
    /// Deleting a session that does not exist is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all stored sessions, most recently updated first.
    async fn list_all(&self) -> Result<Vec<Session>>;

    /// Gets the ID of the currently active session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(session_id))`: Active session ID
    /// - `Ok(None)`: No active session set
    async fn get_active_session_id(&self) -> Result<Option<String>>;

    /// Sets the ID of the currently active session.
    async fn set_active_session_id(&self, session_id: &str) -> Result<()>;
}
