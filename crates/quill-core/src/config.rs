//! Engine configuration model.
//!
//! Configuration is read fresh on every scheduling decision so edits to the
//! backing file take effect on the next turn.

use crate::error::Result;
use crate::persona::AgentProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

pub const DEFAULT_GROUNDING_INSTRUCTION: &str = "Ground your reply in the concrete names, scenes and details visible in the current document and workspace files above. Do not refer to them generically, and never claim you cannot see the document. If you want to change the document, end your reply with a JSON array of actions like [{\"type\": \"suggest\", \"range\": \"3-4\", \"content\": \"...\", \"reasoning\": \"...\"}].";

/// Root of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub context: ContextConfig,
    pub model: ModelConfig,
    pub executor: ExecutorConfig,
    /// Per-agent overlay flags keyed by agent id.
    pub agents: BTreeMap<String, AgentToggle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Default number of rounds for a bounded discussion.
    pub max_rounds: usize,
    /// Pause between agent turns inside a discussion.
    pub turn_delay_ms: u64,
    pub ensemble_min: usize,
    pub ensemble_max: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            turn_delay_ms: 1500,
            ensemble_min: 2,
            ensemble_max: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub max_workspace_files: usize,
    pub workspace_file_char_budget: usize,
    pub transcript_tail: usize,
    pub workspace_extensions: Vec<String>,
    pub grounding_instruction: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_workspace_files: 3,
            workspace_file_char_budget: 2000,
            transcript_tail: 10,
            workspace_extensions: vec!["md".into(), "txt".into(), "fountain".into()],
            grounding_instruction: DEFAULT_GROUNDING_INSTRUCTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Bounded wait for a single model call.
    pub timeout_secs: u64,
    pub endpoint: Option<String>,
    pub model_name: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            endpoint: None,
            model_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub stream_char_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            stream_char_delay_ms: 15,
        }
    }
}

/// Overlay flags for one agent. `None` keeps the profile's own value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentToggle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl EngineConfig {
    /// Applies the per-agent overlay flags to a profile.
    pub fn overlay(&self, mut profile: AgentProfile) -> AgentProfile {
        if let Some(toggle) = self.agents.get(&profile.id) {
            if let Some(active) = toggle.active {
                profile.is_active_in_config = active;
            }
            if let Some(available) = toggle.available {
                profile.is_available = available;
            }
        }
        profile
    }

    pub fn set_agent_active(&mut self, agent_id: &str, active: bool) {
        self.agents.entry(agent_id.to_string()).or_default().active = Some(active);
    }
}

/// Source of the engine configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<EngineConfig>;
}

/// A fixed configuration held in memory. Mutations are visible on the next `load`.
#[derive(Debug, Default)]
pub struct StaticConfigSource {
    config: RwLock<EngineConfig>,
}

impl StaticConfigSource {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Applies `f` to the held configuration.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut guard = self.config.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn load(&self) -> Result<EngineConfig> {
        let guard = self.config.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}
