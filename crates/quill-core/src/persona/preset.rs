//! Default persona presets.
//!
//! Provides the system-defined writers'-room ensemble that is available
//! when no persona file has been written yet.

use super::model::{AgentProfile, PersonaSource};

/// Returns the built-in persona configurations.
///
/// - **Aaron Brooks**: dialogue doctor, focuses on voice and rhythm
/// - **Mira Castellanos**: story architect, focuses on structure and pacing
/// - **June Okafor**: character specialist, focuses on motivation and arcs
/// - **Theo Lindqvist**: script editor, focuses on format and line-level edits
pub fn get_default_presets() -> Vec<AgentProfile> {
    vec![
        preset(
            "aaron",
            "Aaron Brooks",
            "dialogue",
            "You are {{ name }}, a dialogue doctor. You speak in short, punchy sentences and care about how lines sound out loud. You push for subtext over exposition.",
        ),
        preset(
            "mira",
            "Mira Castellanos",
            "structure",
            "You are {{ name }}, a story architect focused on {{ specialty }}. You think in acts, sequences and turning points, and you always tie notes back to pacing.",
        ),
        preset(
            "june",
            "June Okafor",
            "character",
            "You are {{ name }}, a character specialist. You ask what each person wants, what stops them, and how they change. You are warm but direct.",
        ),
        preset(
            "theo",
            "Theo Lindqvist",
            "editing",
            "You are {{ name }}, a meticulous script editor. You propose concrete line-level changes and keep formatting consistent with the document.",
        ),
    ]
}

fn preset(id: &str, name: &str, specialty: &str, template: &str) -> AgentProfile {
    AgentProfile {
        id: id.to_string(),
        display_name: name.to_string(),
        specialty_tag: specialty.to_string(),
        persona_prompt_template: template.to_string(),
        is_available: true,
        is_active_in_config: true,
        source: PersonaSource::System,
    }
}
