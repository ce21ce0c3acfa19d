use super::loosely_matches;
use async_trait::async_trait;
use quill_core::document::{
    ActiveDocument, DocumentHost, DocumentLookup, Position, TextRange, WorkspaceFile,
};
use quill_core::error::{QuillError, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;

const SCHEME: &str = "mem://";

#[derive(Default)]
struct State {
    documents: BTreeMap<String, String>,
    active: Option<String>,
    selection: Option<TextRange>,
    caret: Position,
    opened: Vec<String>,
}

/// A DocumentHost that keeps every document in memory.
///
/// Documents are keyed by `mem://<name>`.
#[derive(Default)]
pub struct InMemoryDocumentHost {
    state: Mutex<State>,
}

impl InMemoryDocumentHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uri_for(name: &str) -> String {
        format!("{}{}", SCHEME, name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a workspace document and returns its uri.
    pub fn insert(&self, name: &str, text: &str) -> String {
        let uri = Self::uri_for(name);
        self.lock().documents.insert(uri.clone(), text.to_string());
        uri
    }

    /// Adds a document and focuses it.
    pub fn with_active(self, name: &str, text: &str) -> Self {
        let uri = self.insert(name, text);
        self.lock().active = Some(uri);
        self
    }

    pub fn set_selection(&self, selection: Option<TextRange>) {
        self.lock().selection = selection;
    }

    pub fn set_caret(&self, caret: Position) {
        self.lock().caret = caret;
    }

    pub fn text_of(&self, uri: &str) -> Option<String> {
        self.lock().documents.get(uri).cloned()
    }

    /// Uris passed to `open_document`, in order.
    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    fn display_name(uri: &str) -> String {
        uri.strip_prefix(SCHEME).unwrap_or(uri).to_string()
    }

    fn has_extension(name: &str, extensions: &[String]) -> bool {
        name.rsplit_once('.')
            .map(|(_, ext)| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

#[async_trait]
impl DocumentHost for InMemoryDocumentHost {
    async fn active_document(&self) -> Result<Option<ActiveDocument>> {
        let state = self.lock();
        let Some(uri) = state.active.clone() else {
            return Ok(None);
        };
        let text = state.documents.get(&uri).cloned().unwrap_or_default();
        Ok(Some(ActiveDocument {
            display_name: Self::display_name(&uri),
            uri,
            text,
            selection: state.selection,
            caret: state.caret,
        }))
    }

    async fn read_document(&self, uri: &str) -> Result<String> {
        self.text_of(uri)
            .ok_or_else(|| QuillError::not_found("Document", uri))
    }

    async fn replace_range(&self, uri: &str, range: TextRange, text: &str) -> Result<()> {
        let mut state = self.lock();
        let document = state
            .documents
            .get_mut(uri)
            .ok_or_else(|| QuillError::not_found("Document", uri))?;
        let bytes = range
            .to_byte_range(document)
            .ok_or_else(|| QuillError::document(format!("range {:?} is outside {}", range, uri)))?;
        document.replace_range(bytes, text);
        Ok(())
    }

    async fn set_text(&self, uri: &str, text: &str) -> Result<()> {
        let mut state = self.lock();
        let document = state
            .documents
            .get_mut(uri)
            .ok_or_else(|| QuillError::not_found("Document", uri))?;
        *document = text.to_string();
        Ok(())
    }

    async fn list_workspace_files(
        &self,
        extensions: &[String],
        limit: usize,
    ) -> Result<Vec<WorkspaceFile>> {
        let state = self.lock();
        Ok(state
            .documents
            .iter()
            .filter(|(uri, _)| Self::has_extension(uri, extensions))
            .take(limit)
            .map(|(uri, text)| WorkspaceFile {
                uri: uri.clone(),
                display_name: Self::display_name(uri),
                text: text.clone(),
            })
            .collect())
    }

    async fn document_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock().documents.contains_key(&Self::uri_for(name)))
    }

    async fn create_document(&self, name: &str, content: &str) -> Result<String> {
        let uri = Self::uri_for(name);
        let mut state = self.lock();
        if state.documents.contains_key(&uri) {
            return Err(QuillError::document(format!("{} already exists", name)));
        }
        state.documents.insert(uri.clone(), content.to_string());
        Ok(uri)
    }

    async fn open_document(&self, uri: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.documents.contains_key(uri) {
            return Err(QuillError::not_found("Document", uri));
        }
        state.opened.push(uri.to_string());
        state.active = Some(uri.to_string());
        Ok(())
    }
}

#[async_trait]
impl DocumentLookup for InMemoryDocumentHost {
    async fn find_document(&self, name: &str) -> Result<Option<WorkspaceFile>> {
        let state = self.lock();
        Ok(state
            .documents
            .iter()
            .find(|(uri, _)| loosely_matches(name, &Self::display_name(uri)))
            .map(|(uri, text)| WorkspaceFile {
                uri: uri.clone(),
                display_name: Self::display_name(uri),
                text: text.clone(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replace_range_edits_full_lines() {
        let host = InMemoryDocumentHost::new().with_active("scene.fountain", "a\nb\nc\n");
        let uri = InMemoryDocumentHost::uri_for("scene.fountain");

        let range = TextRange::from_line_spec("2-2").unwrap();
        host.replace_range(&uri, range, "B\n").await.unwrap();

        assert_eq!(host.text_of(&uri).unwrap(), "a\nB\nc\n");
    }

    #[tokio::test]
    async fn out_of_range_edit_is_rejected() {
        let host = InMemoryDocumentHost::new().with_active("scene.md", "a");
        let uri = InMemoryDocumentHost::uri_for("scene.md");

        let range = TextRange::from_line_spec("3-4").unwrap();
        assert!(host.replace_range(&uri, range, "x").await.is_err());
    }

    #[tokio::test]
    async fn workspace_listing_filters_and_caps() {
        let host = InMemoryDocumentHost::new();
        host.insert("a.md", "A");
        host.insert("b.txt", "B");
        host.insert("c.png", "C");
        host.insert("d.md", "D");

        let files = host
            .list_workspace_files(&["md".to_string(), "txt".to_string()], 2)
            .await
            .unwrap();
        let names: Vec<_> = files.iter().map(|f| f.display_name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[tokio::test]
    async fn created_documents_can_be_opened_and_found() {
        let host = InMemoryDocumentHost::new();
        let uri = host.create_document("heist-outline.md", "# Story Outline").await.unwrap();
        assert!(host.create_document("heist-outline.md", "x").await.is_err());

        host.open_document(&uri).await.unwrap();
        assert_eq!(host.opened(), vec![uri.clone()]);
        assert_eq!(host.active_document().await.unwrap().unwrap().uri, uri);

        let found = host.find_document("heist outline").await.unwrap().unwrap();
        assert_eq!(found.text, "# Story Outline");
    }
}
