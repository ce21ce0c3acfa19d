//! TOML-based PersonaRepository implementation

use crate::dto::PersonaFileV1;
use crate::storage::AtomicTomlFile;
use quill_core::error::{QuillError, Result};
use quill_core::persona::{AgentProfile, get_default_presets};
use quill_core::repository::PersonaRepository;
use std::path::PathBuf;

/// Stores personas as `[[persona]]` tables in a TOML file.
///
/// When the file does not exist yet, the built-in presets are returned so a
/// fresh install always has an ensemble to talk to.
pub struct TomlPersonaRepository {
    file: AtomicTomlFile<PersonaFileV1>,
}

impl TomlPersonaRepository {
    /// Creates a repository at the default path (`~/.config/quill/personas.toml`).
    pub fn new() -> Result<Self> {
        let path = crate::paths::QuillPaths::personas_file()
            .map_err(|e| QuillError::config(e.to_string()))?;
        Ok(Self::with_path(path))
    }

    /// Creates a repository with a custom path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }
}

#[async_trait::async_trait]
impl PersonaRepository for TomlPersonaRepository {
    async fn get_all(&self) -> Result<Vec<AgentProfile>> {
        match self.file.load()? {
            Some(file) => Ok(file.personas),
            None => Ok(get_default_presets()),
        }
    }

    async fn save_all(&self, personas: &[AgentProfile]) -> Result<()> {
        self.file.save(&PersonaFileV1 {
            personas: personas.to_vec(),
        })?;
        Ok(())
    }
}
