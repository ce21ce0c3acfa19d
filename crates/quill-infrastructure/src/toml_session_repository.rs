//! TOML-based SessionRepository implementation

use crate::dto::{SESSION_ENTITY, create_session_migrator};
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use quill_core::error::{QuillError, Result};
use quill_core::repository::SessionRepository;
use quill_core::session::Session;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use version_migrate::Migrator;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ActiveSessionPointer {
    session_id: Option<String>,
}

/// A repository implementation storing each session in its own TOML file.
///
/// - Reads and writes through the session migrator, so every file carries a
///   `version` key and an unknown version is an error, not a silent V1 read
/// - Writes through `AtomicTomlFile`, so a saved session survives a crash
///   immediately after `save` returns
///
/// ```text
/// base_dir/
/// ├── sessions/
/// │   ├── <session-id-1>.toml
/// │   └── <session-id-2>.toml
/// └── active_session.toml
/// ```
pub struct TomlSessionRepository {
    base_dir: PathBuf,
    migrator: Migrator,
}

impl TomlSessionRepository {
    /// Creates the repository, creating `base_dir/sessions` if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join("sessions"))?;
        Ok(Self {
            base_dir,
            migrator: create_session_migrator()?,
        })
    }

    /// Creates the repository at the default location (`~/.config/quill`).
    pub fn default_location() -> Result<Self> {
        let base_dir = crate::paths::QuillPaths::config_dir()
            .map_err(|e| QuillError::config(e.to_string()))?;
        Self::new(base_dir)
    }

    fn sessions_dir(&self) -> PathBuf {
        self.base_dir.join("sessions")
    }

    /// Returns the file for a session id, refusing ids that would escape the directory.
    fn session_file(&self, session_id: &str) -> Option<AtomicTomlFile<toml::Value>> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| {
            AtomicTomlFile::new(self.sessions_dir().join(format!("{}.toml", session_id)))
        })
    }

    fn active_pointer(&self) -> AtomicTomlFile<ActiveSessionPointer> {
        AtomicTomlFile::new(self.base_dir.join("active_session.toml"))
    }

    fn load_session(&self, file: &AtomicTomlFile<toml::Value>) -> Result<Option<Session>> {
        let Some(value) = file.load()? else {
            return Ok(None);
        };
        let session = self
            .migrator
            .load_flat_from(SESSION_ENTITY, value)
            .map_err(|e| {
                QuillError::migration(format!("{}: {}", file.path().display(), e))
            })?;
        Ok(Some(session))
    }

    /// Renders a session as a versioned TOML table.
    fn to_record(&self, session: &Session) -> Result<toml::Value> {
        let json = self
            .migrator
            .save_domain_flat(SESSION_ENTITY, session)
            .map_err(|e| QuillError::migration(format!("session {}: {}", session.id, e)))?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        Ok(toml::Value::try_from(value)?)
    }
}

#[async_trait]
impl SessionRepository for TomlSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let Some(file) = self.session_file(session_id) else {
            return Ok(None);
        };
        self.load_session(&file)
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let file = self
            .session_file(&session.id)
            .ok_or_else(|| QuillError::validation(format!("invalid session id '{}'", session.id)))?;
        file.save(&self.to_record(session)?)?;
        tracing::debug!(
            "[TomlSessionRepository] Saved session {} ({} messages)",
            session.id,
            session.messages.len()
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        if let Some(file) = self.session_file(session_id) {
            file.remove()?;
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();

        for entry in fs::read_dir(self.sessions_dir())? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            match self.load_session(&AtomicTomlFile::new(path.clone())) {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("[TomlSessionRepository] Skipping unreadable session file {:?}: {}", path, e);
                }
            }
        }

        // Most recent first
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn get_active_session_id(&self) -> Result<Option<String>> {
        Ok(self.active_pointer().load()?.and_then(|p| p.session_id))
    }

    async fn set_active_session_id(&self, session_id: &str) -> Result<()> {
        self.active_pointer().update(ActiveSessionPointer::default(), |pointer| {
            pointer.session_id = Some(session_id.to_string());
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::session::{Message, SessionKind};
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();

        let mut session = Session::new(SessionKind::MultiAgent);
        session.selected_agent_ids.insert("mira".to_string());
        session.push(Message::user("INT. KITCHEN - DAY"));
        session.push(Message::agent("mira", "Mira Castellanos", "Open on the kettle."));
        repo.save(&session).await.unwrap();

        let loaded = repo.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn unknown_and_malicious_ids_are_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();

        assert!(repo.find_by_id("missing").await.unwrap().is_none());
        assert!(repo.find_by_id("../etc/passwd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_all_is_most_recent_first_and_skips_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();

        let older = Session::new(SessionKind::SingleAgent);
        let mut newer = Session::new(SessionKind::MultiAgent);
        newer.updated_at = older.updated_at + chrono::Duration::seconds(5);
        repo.save(&older).await.unwrap();
        repo.save(&newer).await.unwrap();
        fs::write(temp_dir.path().join("sessions/broken.toml"), "id = ").unwrap();

        let ids: Vec<String> = repo.list_all().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn saved_files_carry_the_schema_version() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        let session = Session::new(SessionKind::MultiAgent);
        repo.save(&session).await.unwrap();

        let raw = fs::read_to_string(
            temp_dir
                .path()
                .join(format!("sessions/{}.toml", session.id)),
        )
        .unwrap();
        assert!(raw.contains("version = \"1.0.0\""));
    }

    #[tokio::test]
    async fn files_from_a_newer_schema_are_refused() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        fs::write(
            temp_dir.path().join("sessions/s1.toml"),
            r#"
version = "9.0.0"
id = "s1"
title = "From the future"
created_at = "2026-10-01T09:00:00Z"
updated_at = "2026-10-01T09:00:00Z"
"#,
        )
        .unwrap();

        let err = repo.find_by_id("s1").await.unwrap_err();
        assert!(matches!(err, QuillError::Migration(_)), "got {:?}", err);
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_session_pointer_persists() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlSessionRepository::new(temp_dir.path()).unwrap();
        assert!(repo.get_active_session_id().await.unwrap().is_none());

        repo.set_active_session_id("abc").await.unwrap();

        let reopened = TomlSessionRepository::new(temp_dir.path()).unwrap();
        assert_eq!(
            reopened.get_active_session_id().await.unwrap().as_deref(),
            Some("abc")
        );
    }
}
