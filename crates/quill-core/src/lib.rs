//! Domain layer of the Quill writers'-room engine.
//!
//! Holds the models shared by every other crate (sessions, personas,
//! document actions), the error type, configuration, and the traits the
//! engine uses to reach its collaborators: persistence, the language-model
//! service and the editor host.

pub mod config;
pub mod document;
pub mod error;
pub mod intent;
pub mod llm;
pub mod persona;
pub mod session;

// Re-export common error type
pub use error::QuillError;

/// Repository traits grouped for convenience.
pub mod repository {
    pub use crate::persona::PersonaRepository;
    pub use crate::session::SessionRepository;
}
