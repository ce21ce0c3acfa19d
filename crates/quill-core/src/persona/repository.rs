//! Persona repository trait.
//!
//! Defines the interface for persona persistence operations.

use super::model::AgentProfile;
use crate::error::Result;

/// An abstract repository for managing persona persistence.
///
/// This trait defines the contract for persisting and retrieving personas,
/// decoupling the engine's core logic from the specific storage mechanism.
#[async_trait::async_trait]
pub trait PersonaRepository: Send + Sync {
    /// Retrieves all personas from storage.
    async fn get_all(&self) -> Result<Vec<AgentProfile>>;

    /// Saves all personas to storage, replacing existing ones.
    async fn save_all(&self, personas: &[AgentProfile]) -> Result<()>;
}
