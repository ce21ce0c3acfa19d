//! Persona domain model.
//!
//! Represents the simulated collaborators that take part in a session.
//! Each persona has a display name, a specialty and a voice template.

use serde::{Deserialize, Serialize};

/// Represents the source of a persona (system-provided or user-created).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersonaSource {
    /// System-provided default personas
    System,
    /// User-created custom personas
    #[default]
    User,
}

/// A named simulated collaborator.
///
/// Everything except `is_available` and `is_active_in_config` is static for
/// the process lifetime. Those two flags are overlaid from configuration on
/// every scheduling decision.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AgentProfile {
    /// Stable identifier
    pub id: String,
    /// Display name of the persona (e.g. "Aaron Brooks")
    pub display_name: String,
    /// Short specialty tag (e.g. "dialogue", "structure")
    pub specialty_tag: String,
    /// Voice/style template rendered at the top of every prompt
    pub persona_prompt_template: String,
    /// Whether the persona can currently take turns
    #[serde(default = "default_true")]
    pub is_available: bool,
    /// Whether configuration enables the persona
    #[serde(default = "default_true")]
    pub is_active_in_config: bool,
    /// Source of the persona (System or User)
    #[serde(default)]
    pub source: PersonaSource,
}

fn default_true() -> bool {
    true
}

impl AgentProfile {
    /// First whitespace-separated token of the display name.
    pub fn first_name(&self) -> &str {
        self.display_name
            .split_whitespace()
            .next()
            .unwrap_or(self.display_name.as_str())
    }

    /// Available AND enabled by configuration.
    pub fn is_eligible(&self) -> bool {
        self.is_available && self.is_active_in_config
    }
}
