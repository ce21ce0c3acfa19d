//! Unified path management for Quill files.
//!
//! ```text
//! ~/.config/quill/
//! ├── config.toml        # Engine configuration (hot-reloaded)
//! ├── personas.toml      # Persona definitions
//! ├── active_session.toml
//! ├── logs/quill.log     # REPL log output
//! └── sessions/          # One TOML file per session
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct QuillPaths;

impl QuillPaths {
    /// `QUILL_HOME` when set, otherwise the platform config dir joined with `quill`.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        if let Some(home) = std::env::var_os("QUILL_HOME") {
            return Ok(PathBuf::from(home));
        }
        dirs::config_dir()
            .map(|dir| dir.join("quill"))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn personas_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("personas.toml"))
    }

    pub fn log_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs").join("quill.log"))
    }
}
