//! Storage and host adapters for the Quill engine.
//!
//! Implements the repository, configuration and document-host traits from
//! `quill-core` on top of TOML files, plain directories, or memory.

pub mod document_host;
pub mod dto;
pub mod memory_session_repository;
pub mod paths;
pub mod storage;
pub mod toml_config_source;
pub mod toml_persona_repository;
pub mod toml_session_repository;

pub use crate::document_host::{FsDocumentHost, InMemoryDocumentHost};
pub use crate::memory_session_repository::InMemorySessionRepository;
pub use crate::toml_config_source::TomlConfigSource;
pub use crate::toml_persona_repository::TomlPersonaRepository;
pub use crate::toml_session_repository::TomlSessionRepository;
