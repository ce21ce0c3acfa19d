//! Registry of personas with configuration overlaid on every read.

use quill_core::config::{ConfigSource, EngineConfig};
use quill_core::error::{QuillError, Result};
use quill_core::persona::{AgentProfile, PersonaRepository};
use std::sync::Arc;

/// Persona definitions are loaded once; the availability and activation
/// flags come from the [`ConfigSource`] each time they are asked for.
pub struct AgentRoster {
    profiles: Vec<AgentProfile>,
    config: Arc<dyn ConfigSource>,
}

impl AgentRoster {
    pub fn new(profiles: Vec<AgentProfile>, config: Arc<dyn ConfigSource>) -> Self {
        Self { profiles, config }
    }

    /// Loads persona definitions from `repository`.
    pub async fn load(
        repository: &dyn PersonaRepository,
        config: Arc<dyn ConfigSource>,
    ) -> Result<Self> {
        let profiles = repository.get_all().await?;
        tracing::info!("[AgentRoster] Loaded {} personas", profiles.len());
        Ok(Self::new(profiles, config))
    }

    /// Profiles as loaded, without any overlay.
    pub fn profiles(&self) -> &[AgentProfile] {
        &self.profiles
    }

    pub async fn list(&self) -> Result<Vec<AgentProfile>> {
        let config = self.config.load().await?;
        Ok(self.list_with(&config))
    }

    /// Overlays an already loaded configuration.
    pub fn list_with(&self, config: &EngineConfig) -> Vec<AgentProfile> {
        self.profiles
            .iter()
            .cloned()
            .map(|p| config.overlay(p))
            .collect()
    }

    pub fn eligible_with(&self, config: &EngineConfig) -> Vec<AgentProfile> {
        self.list_with(config)
            .into_iter()
            .filter(AgentProfile::is_eligible)
            .collect()
    }

    pub async fn get(&self, agent_id: &str) -> Result<AgentProfile> {
        let config = self.config.load().await?;
        self.get_with(agent_id, &config)
    }

    pub fn get_with(&self, agent_id: &str, config: &EngineConfig) -> Result<AgentProfile> {
        self.profiles
            .iter()
            .find(|p| p.id == agent_id)
            .cloned()
            .map(|p| config.overlay(p))
            .ok_or_else(|| QuillError::not_found("Agent", agent_id))
    }

    /// Available and active in configuration. Unknown ids are never eligible.
    pub async fn is_eligible(&self, agent_id: &str) -> Result<bool> {
        match self.get(agent_id).await {
            Ok(profile) => Ok(profile.is_eligible()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::config::StaticConfigSource;
    use quill_core::persona::get_default_presets;

    fn roster() -> (AgentRoster, Arc<StaticConfigSource>) {
        let config = Arc::new(StaticConfigSource::new(EngineConfig::default()));
        (AgentRoster::new(get_default_presets(), config.clone()), config)
    }

    #[tokio::test]
    async fn config_changes_apply_on_next_read() {
        let (roster, config) = roster();
        assert!(roster.is_eligible("aaron").await.unwrap());

        config.update(|c| c.set_agent_active("aaron", false));

        assert!(!roster.is_eligible("aaron").await.unwrap());
        let listed = roster.list().await.unwrap();
        assert_eq!(listed.len(), 4);
        assert!(!listed.iter().find(|p| p.id == "aaron").unwrap().is_active_in_config);
        assert!(roster.profiles()[0].is_active_in_config);
    }

    #[tokio::test]
    async fn unknown_agents_are_not_found_and_ineligible() {
        let (roster, _) = roster();
        assert!(roster.get("nobody").await.unwrap_err().is_not_found());
        assert!(!roster.is_eligible("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_agents_drop_out_of_eligible_set() {
        let (roster, config) = roster();
        config.update(|c| {
            c.agents.entry("june".into()).or_default().available = Some(false);
        });

        let loaded = config.load().await.unwrap();
        let ids: Vec<String> = roster.eligible_with(&loaded).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["aaron", "mira", "theo"]);
    }
}
