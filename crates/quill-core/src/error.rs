//! Error types for the Quill engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Quill engine.
///
/// Variants map onto the engine's failure taxonomy:
/// - transient-external failures (`Model`, `Timeout`) are caught per agent turn
/// - validation failures (`Validation`, `NotFound`) are raised before any model call
/// - storage failures (`Io`, `Serialization`, `Migration`) are fatal to the call and propagate
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum QuillError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// A stored record could not be brought to the current schema
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an invalid request (rejected before any model call)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conversation-analysis pass is already running for the session
    #[error("Session '{session_id}' is busy with another conversation pass")]
    Busy { session_id: String },

    /// The language-model service rejected the call
    #[error("Model call failed for agent '{agent_id}': {message}")]
    Model { agent_id: String, message: String },

    /// The language-model service did not answer within the configured bound
    #[error("Model call for agent '{agent_id}' timed out after {seconds}s")]
    Timeout { agent_id: String, seconds: u64 },

    /// Document host operation failed
    #[error("Document error: {0}")]
    Document(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuillError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Migration error
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Model error for the given agent
    pub fn model(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            agent_id: agent_id.into(),
            message: message.into(),
        }
    }

    /// Creates a Document error
    pub fn document(message: impl Into<String>) -> Self {
        Self::Document(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a busy-session rejection
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    /// Check if this error came from the language-model boundary.
    ///
    /// Such errors are recoverable per turn: the orchestrator records them
    /// as system messages and continues with the remaining agents.
    pub fn is_transient_external(&self) -> bool {
        matches!(self, Self::Model { .. } | Self::Timeout { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for QuillError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for QuillError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for QuillError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used by adapters at the edges)
impl From<anyhow::Error> for QuillError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, QuillError>`.
pub type Result<T> = std::result::Result<T, QuillError>;
