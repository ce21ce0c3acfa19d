//! Document-host collaborator traits.
//!
//! The editor host owns rendering and file I/O. The engine reads through
//! these traits and only mutates documents via the action executor.

use super::range::{Position, TextRange};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The currently focused document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDocument {
    pub uri: String,
    pub display_name: String,
    pub text: String,
    pub selection: Option<TextRange>,
    pub caret: Position,
}

/// A text file found in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    pub uri: String,
    pub display_name: String,
    pub text: String,
}

/// Editor host surface used by the context builder and the action executor.
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// Returns the focused document, if any.
    async fn active_document(&self) -> Result<Option<ActiveDocument>>;

    /// Reads the full text of a document.
    async fn read_document(&self, uri: &str) -> Result<String>;

    /// Replaces `range` with `text`. An empty range inserts.
    async fn replace_range(&self, uri: &str, range: TextRange, text: &str) -> Result<()>;

    /// Replaces the whole document text.
    async fn set_text(&self, uri: &str, text: &str) -> Result<()>;

    /// Lists up to `limit` workspace text files whose extension is in `extensions`.
    async fn list_workspace_files(
        &self,
        extensions: &[String],
        limit: usize,
    ) -> Result<Vec<WorkspaceFile>>;

    /// Returns true if a document with this file name already exists.
    async fn document_exists(&self, name: &str) -> Result<bool>;

    /// Creates a new document and returns its uri.
    async fn create_document(&self, name: &str, content: &str) -> Result<String>;

    /// Opens a document for display.
    async fn open_document(&self, uri: &str) -> Result<()>;
}

/// Read-only lookup of documents by loose name ("the pilot outline").
#[async_trait]
pub trait DocumentLookup: Send + Sync {
    async fn find_document(&self, name: &str) -> Result<Option<WorkspaceFile>>;
}
