//! Session domain module.
//!
//! This module contains all session-related domain models and the
//! repository interface used to persist them.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `SessionKind`)
//! - `message`: Conversation message types (`Message`, `MessageKind`)
//! - `repository`: Repository trait for session persistence
//!
//! # Usage
//!
//! ```ignore
//! use quill_core::session::{Session, SessionKind, SessionRepository};
//! use quill_core::session::{Message, MessageKind};
//! ```

mod message;
mod model;
mod repository;

// Re-export public API
pub use message::{Message, MessageKind, SYSTEM_AUTHOR_ID, USER_AUTHOR_ID};
pub use model::{Session, SessionKind};
pub use repository::SessionRepository;
