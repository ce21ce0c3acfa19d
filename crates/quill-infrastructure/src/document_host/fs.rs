use super::loosely_matches;
use async_trait::async_trait;
use quill_core::document::{
    ActiveDocument, DocumentHost, DocumentLookup, Position, TextRange, WorkspaceFile,
};
use quill_core::error::{QuillError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Maximum directory depth scanned for workspace files.
const MAX_SCAN_DEPTH: usize = 4;

#[derive(Default)]
struct Focus {
    path: Option<PathBuf>,
    selection: Option<TextRange>,
    caret: Position,
}

/// A DocumentHost over a plain directory. Uris are file paths.
pub struct FsDocumentHost {
    root: PathBuf,
    focus: Mutex<Focus>,
}

impl FsDocumentHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            focus: Mutex::new(Focus::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn focus(&self) -> std::sync::MutexGuard<'_, Focus> {
        self.focus.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Focuses a file relative to the root.
    pub fn focus_file(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(QuillError::not_found("Document", path.display().to_string()));
        }
        let mut focus = self.focus();
        focus.path = Some(path.clone());
        focus.selection = None;
        focus.caret = Position::default();
        Ok(path.display().to_string())
    }

    pub fn set_selection(&self, selection: Option<TextRange>) {
        self.focus().selection = selection;
    }

    fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    fn collect_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                !p.file_name()
                    .map(|n| n.to_string_lossy().starts_with('.'))
                    .unwrap_or(true)
            })
            .collect();
        entries.sort();

        for path in entries {
            if path.is_dir() {
                if depth < MAX_SCAN_DEPTH {
                    Self::collect_files(&path, depth + 1, out)?;
                }
            } else {
                out.push(path);
            }
        }
        Ok(())
    }

    fn workspace_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        Self::collect_files(&self.root, 0, &mut paths)?;
        Ok(paths)
    }

    fn to_workspace_file(path: &Path) -> Option<WorkspaceFile> {
        let text = fs::read_to_string(path).ok()?;
        Some(WorkspaceFile {
            uri: path.display().to_string(),
            display_name: Self::display_name(path),
            text,
        })
    }
}

#[async_trait]
impl DocumentHost for FsDocumentHost {
    async fn active_document(&self) -> Result<Option<ActiveDocument>> {
        let (path, selection, caret) = {
            let focus = self.focus();
            match &focus.path {
                Some(path) => (path.clone(), focus.selection, focus.caret),
                None => return Ok(None),
            }
        };
        let text = fs::read_to_string(&path)?;
        Ok(Some(ActiveDocument {
            uri: path.display().to_string(),
            display_name: Self::display_name(&path),
            text,
            selection,
            caret,
        }))
    }

    async fn read_document(&self, uri: &str) -> Result<String> {
        Ok(fs::read_to_string(uri)?)
    }

    async fn replace_range(&self, uri: &str, range: TextRange, text: &str) -> Result<()> {
        let mut content = fs::read_to_string(uri)?;
        let bytes = range
            .to_byte_range(&content)
            .ok_or_else(|| QuillError::document(format!("range {:?} is outside {}", range, uri)))?;
        content.replace_range(bytes, text);
        fs::write(uri, content)?;
        Ok(())
    }

    async fn set_text(&self, uri: &str, text: &str) -> Result<()> {
        fs::write(uri, text)?;
        Ok(())
    }

    async fn list_workspace_files(
        &self,
        extensions: &[String],
        limit: usize,
    ) -> Result<Vec<WorkspaceFile>> {
        Ok(self
            .workspace_paths()?
            .into_iter()
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
                    .unwrap_or(false)
            })
            .filter_map(|p| Self::to_workspace_file(&p))
            .take(limit)
            .collect())
    }

    async fn document_exists(&self, name: &str) -> Result<bool> {
        Ok(self.root.join(name).exists())
    }

    async fn create_document(&self, name: &str, content: &str) -> Result<String> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        Ok(path.display().to_string())
    }

    async fn open_document(&self, uri: &str) -> Result<()> {
        let path = PathBuf::from(uri);
        if !path.is_file() {
            return Err(QuillError::not_found("Document", uri));
        }
        let mut focus = self.focus();
        focus.path = Some(path);
        focus.selection = None;
        focus.caret = Position::default();
        Ok(())
    }
}

#[async_trait]
impl DocumentLookup for FsDocumentHost {
    async fn find_document(&self, name: &str) -> Result<Option<WorkspaceFile>> {
        Ok(self
            .workspace_paths()?
            .into_iter()
            .find(|p| loosely_matches(name, &Self::display_name(p)))
            .and_then(|p| Self::to_workspace_file(&p)))
    }
}
