//! File-backed ConfigSource.

use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use quill_core::config::{ConfigSource, EngineConfig};
use quill_core::error::{QuillError, Result};
use std::path::PathBuf;

/// Reads `config.toml` on every `load`, so edits apply on the next turn.
///
/// A missing file yields the default configuration.
pub struct TomlConfigSource {
    file: AtomicTomlFile<EngineConfig>,
}

impl TomlConfigSource {
    pub fn new() -> Result<Self> {
        let path = crate::paths::QuillPaths::config_file()
            .map_err(|e| QuillError::config(e.to_string()))?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    /// Toggles an agent's activation flag in the file.
    pub fn set_agent_active(&self, agent_id: &str, active: bool) -> Result<()> {
        self.file.update(EngineConfig::default(), |config| {
            config.set_agent_active(agent_id, active)
        })?;
        Ok(())
    }

    pub fn save(&self, config: &EngineConfig) -> Result<()> {
        self.file.save(config)?;
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for TomlConfigSource {
    async fn load(&self) -> Result<EngineConfig> {
        let config = self
            .file
            .load()
            .map_err(|e| QuillError::config(format!("{:?}: {}", self.file.path(), e)))?;
        Ok(config.unwrap_or_default())
    }
}
