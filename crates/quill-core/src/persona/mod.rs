//! Persona domain module.
//!
//! This module contains the agent profile model, the repository interface
//! used to load it, and the built-in writers'-room presets.
//!
//! # Module Structure
//!
//! - `model`: Core persona domain models (`AgentProfile`, `PersonaSource`)
//! - `repository`: Repository trait for persona persistence
//! - `preset`: Default system personas

mod model;
mod preset;
mod repository;

// Re-export public API
pub use model::{AgentProfile, PersonaSource};
pub use preset::get_default_presets;
pub use repository::PersonaRepository;
