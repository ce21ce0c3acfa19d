//! Persona file DTO.

use quill_core::persona::AgentProfile;
use serde::{Deserialize, Serialize};

/// Layout of `personas.toml`: a list of `[[persona]]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaFileV1 {
    #[serde(rename = "persona", default)]
    pub personas: Vec<AgentProfile>,
}
