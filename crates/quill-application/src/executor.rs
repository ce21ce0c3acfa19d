//! Applies [`DocumentAction`]s to documents owned by the host.
//!
//! Every mutation is bracketed by snapshots: the prior state is recorded
//! (unless the latest snapshot already holds it) and the resulting state is
//! recorded after. `rollback` therefore always has a state to return to once
//! a single mutation has happened.

use chrono::{DateTime, Utc};
use quill_core::config::ExecutorConfig;
use quill_core::document::{
    ActionKind, DocumentAction, DocumentHost, Position, Snapshot, TextRange,
};
use quill_core::error::{QuillError, Result};
use quill_interaction::interpreter::templates;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

use crate::snapshot_store::SnapshotStore;

/// Tracing target for action notifications.
pub const ACTION_TARGET: &str = "quill::action";

const MAX_NAME_ATTEMPTS: usize = 1000;

/// A registered, not yet applied change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSuggestion {
    pub id: String,
    pub document_uri: String,
    pub range: TextRange,
    pub content: String,
    pub reasoning: Option<String>,
    pub origin_agent_id: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a rollback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    Restored { snapshot_id: String },
    /// Fewer than two snapshots exist; nothing changed.
    InsufficientHistory,
}

/// What executing one action did.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Suggested {
        suggestion_id: String,
        document_uri: String,
    },
    Applied {
        document_uri: String,
    },
    Created {
        document_uri: String,
        name: String,
    },
    Streamed {
        document_uri: String,
        chars: usize,
    },
    RolledBack {
        document_uri: String,
        outcome: RollbackOutcome,
    },
}

impl ActionOutcome {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionOutcome::Suggested { .. } => ActionKind::Suggest,
            ActionOutcome::Applied { .. } => ActionKind::Apply,
            ActionOutcome::Created { .. } => ActionKind::Create,
            ActionOutcome::Streamed { .. } => ActionKind::Stream,
            ActionOutcome::RolledBack { .. } => ActionKind::Rollback,
        }
    }

    pub fn document_uri(&self) -> &str {
        match self {
            ActionOutcome::Suggested { document_uri, .. }
            | ActionOutcome::Applied { document_uri }
            | ActionOutcome::Created { document_uri, .. }
            | ActionOutcome::Streamed { document_uri, .. }
            | ActionOutcome::RolledBack { document_uri, .. } => document_uri,
        }
    }

    /// One-line summary for the session log.
    pub fn describe(&self) -> String {
        match self {
            ActionOutcome::Suggested { suggestion_id, document_uri } => {
                format!("suggested a change to {} (suggestion {})", document_uri, suggestion_id)
            }
            ActionOutcome::Applied { document_uri } => format!("edited {}", document_uri),
            ActionOutcome::Created { name, .. } => format!("created {}", name),
            ActionOutcome::Streamed { document_uri, chars } => {
                format!("wrote {} characters into {}", chars, document_uri)
            }
            ActionOutcome::RolledBack {
                document_uri,
                outcome: RollbackOutcome::Restored { .. },
            } => format!("rolled back {}", document_uri),
            ActionOutcome::RolledBack {
                document_uri,
                outcome: RollbackOutcome::InsufficientHistory,
            } => format!("could not roll back {}: not enough history", document_uri),
        }
    }
}

/// Emitted for every mutating action. Purely informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNotification {
    pub kind: ActionKind,
    pub agent_id: String,
    pub reasoning: Option<String>,
    pub document_uri: String,
}

struct Target {
    uri: String,
    default_range: TextRange,
}

pub struct ActionExecutor {
    host: Arc<dyn DocumentHost>,
    snapshots: Mutex<SnapshotStore>,
    pending: Mutex<Vec<PendingSuggestion>>,
    notifier: Option<mpsc::UnboundedSender<ActionNotification>>,
    stream_char_delay: Duration,
}

impl ActionExecutor {
    pub fn new(host: Arc<dyn DocumentHost>) -> Self {
        Self::with_config(host, &ExecutorConfig::default())
    }

    pub fn with_config(host: Arc<dyn DocumentHost>, config: &ExecutorConfig) -> Self {
        Self {
            host,
            snapshots: Mutex::new(SnapshotStore::new()),
            pending: Mutex::new(Vec::new()),
            notifier: None,
            stream_char_delay: Duration::from_millis(config.stream_char_delay_ms),
        }
    }

    /// Also sends notifications to `sender`. A closed receiver is ignored.
    pub fn with_notifier(mut self, sender: mpsc::UnboundedSender<ActionNotification>) -> Self {
        self.notifier = Some(sender);
        self
    }

    pub async fn execute(&self, action: &DocumentAction) -> Result<ActionOutcome> {
        tracing::debug!(
            "[ActionExecutor] {} from {}",
            action.kind,
            action.origin_agent_id
        );
        match action.kind {
            ActionKind::Suggest => self.suggest(action).await,
            ActionKind::Apply => self.apply(action).await,
            ActionKind::Create => self.create(action).await,
            ActionKind::Stream => self.stream(action).await,
            ActionKind::Rollback => {
                let target = self.resolve_target(action).await?;
                let outcome = self.rollback(&target.uri).await?;
                if matches!(outcome, RollbackOutcome::Restored { .. }) {
                    self.notify(action, &target.uri);
                }
                Ok(ActionOutcome::RolledBack {
                    document_uri: target.uri,
                    outcome,
                })
            }
        }
    }

    /// Restores the second-most-recent snapshot of `document_uri`.
    ///
    /// History is only trimmed once the host accepted the write, so a failed
    /// rollback can be retried.
    pub async fn rollback(&self, document_uri: &str) -> Result<RollbackOutcome> {
        let mut snapshots = self.snapshots.lock().await;
        let Some(snapshot) = snapshots.previous(document_uri).cloned() else {
            tracing::warn!(
                "[ActionExecutor] Rollback of {} ignored: fewer than two snapshots",
                document_uri
            );
            return Ok(RollbackOutcome::InsufficientHistory);
        };
        self.host.set_text(document_uri, &snapshot.content).await?;
        snapshots.discard_latest(document_uri);
        tracing::info!(
            "[ActionExecutor] Rolled back {} to snapshot {}",
            document_uri,
            snapshot.id
        );
        Ok(RollbackOutcome::Restored {
            snapshot_id: snapshot.id,
        })
    }

    /// Restores an explicitly addressed snapshot. The restore itself is a
    /// mutation, so a later `rollback` undoes it.
    pub async fn restore_snapshot(&self, document_uri: &str, snapshot_id: &str) -> Result<Snapshot> {
        let mut snapshots = self.snapshots.lock().await;
        let snapshot = snapshots
            .find(document_uri, snapshot_id)
            .cloned()
            .ok_or_else(|| QuillError::not_found("Snapshot", snapshot_id))?;

        let current = self.host.read_document(document_uri).await?;
        snapshots.record_if_changed(document_uri, &current);
        self.host.set_text(document_uri, &snapshot.content).await?;
        snapshots.record(document_uri, &snapshot.content);

        tracing::info!(
            target: ACTION_TARGET,
            kind = "rollback",
            agent_id = "user",
            document = %document_uri,
            reasoning = %format!("restored snapshot {}", snapshot_id),
            "Snapshot restored"
        );
        Ok(snapshot)
    }

    pub async fn snapshot_history(&self, document_uri: &str) -> Vec<Snapshot> {
        self.snapshots.lock().await.history(document_uri).to_vec()
    }

    /// Pending suggestions, optionally for one document, oldest first.
    pub async fn pending_suggestions(&self, document_uri: Option<&str>) -> Vec<PendingSuggestion> {
        self.pending
            .lock()
            .await
            .iter()
            .filter(|s| document_uri.is_none_or(|uri| s.document_uri == uri))
            .cloned()
            .collect()
    }

    /// Commits a pending suggestion. It stays pending if the commit fails.
    pub async fn apply_suggestion(&self, suggestion_id: &str) -> Result<ActionOutcome> {
        let suggestion = self
            .pending
            .lock()
            .await
            .iter()
            .find(|s| s.id == suggestion_id)
            .cloned()
            .ok_or_else(|| QuillError::not_found("Suggestion", suggestion_id))?;

        self.commit(&suggestion.document_uri, suggestion.range, &suggestion.content)
            .await?;
        self.pending.lock().await.retain(|s| s.id != suggestion_id);

        let action = DocumentAction {
            kind: ActionKind::Apply,
            target_document_id: Some(suggestion.document_uri.clone()),
            content: Some(suggestion.content),
            reasoning: suggestion.reasoning,
            range: Some(suggestion.range),
            origin_agent_id: suggestion.origin_agent_id,
        };
        self.notify(&action, &suggestion.document_uri);
        Ok(ActionOutcome::Applied {
            document_uri: suggestion.document_uri,
        })
    }

    pub async fn discard_suggestion(&self, suggestion_id: &str) -> Result<PendingSuggestion> {
        let mut pending = self.pending.lock().await;
        let index = pending
            .iter()
            .position(|s| s.id == suggestion_id)
            .ok_or_else(|| QuillError::not_found("Suggestion", suggestion_id))?;
        Ok(pending.remove(index))
    }

    async fn suggest(&self, action: &DocumentAction) -> Result<ActionOutcome> {
        let target = self.resolve_target(action).await?;
        let suggestion = PendingSuggestion {
            id: uuid::Uuid::new_v4().to_string(),
            document_uri: target.uri.clone(),
            range: action.range.unwrap_or(target.default_range),
            content: action.content.clone().unwrap_or_default(),
            reasoning: action.reasoning.clone(),
            origin_agent_id: action.origin_agent_id.clone(),
            created_at: Utc::now(),
        };
        let suggestion_id = suggestion.id.clone();
        self.pending.lock().await.push(suggestion);

        tracing::debug!(
            "[ActionExecutor] Registered suggestion {} for {}",
            suggestion_id,
            target.uri
        );
        Ok(ActionOutcome::Suggested {
            suggestion_id,
            document_uri: target.uri,
        })
    }

    async fn apply(&self, action: &DocumentAction) -> Result<ActionOutcome> {
        let target = self.resolve_target(action).await?;
        let range = action.range.unwrap_or(target.default_range);
        let content = action.content.as_deref().unwrap_or_default();

        self.commit(&target.uri, range, content).await?;
        self.notify(action, &target.uri);
        Ok(ActionOutcome::Applied {
            document_uri: target.uri,
        })
    }

    async fn create(&self, action: &DocumentAction) -> Result<ActionOutcome> {
        let content = action
            .content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(templates::GENERIC);

        let name = self
            .available_name(&name_stem(content), infer_extension(content))
            .await?;
        let uri = self.host.create_document(&name, content).await?;
        self.snapshots.lock().await.record(&uri, content);
        // The file exists from here on; failing to show it does not undo that.
        if let Err(e) = self.host.open_document(&uri).await {
            tracing::warn!("[ActionExecutor] Created {} but could not open it: {}", uri, e);
        }

        tracing::info!("[ActionExecutor] Created {} ({})", name, uri);
        self.notify(action, &uri);
        Ok(ActionOutcome::Created {
            document_uri: uri,
            name,
        })
    }

    async fn stream(&self, action: &DocumentAction) -> Result<ActionOutcome> {
        let target = self.resolve_target(action).await?;
        let start = action.range.unwrap_or(target.default_range).start;
        let content = action.content.as_deref().unwrap_or_default();

        let mut snapshots = self.snapshots.lock().await;
        let before = self.host.read_document(&target.uri).await?;
        if start.to_offset(&before).is_none() {
            return Err(QuillError::document(format!(
                "stream start {}:{} is outside {}",
                start.line, start.character, target.uri
            )));
        }
        snapshots.record_if_changed(&target.uri, &before);

        let chars = match self.write_chars(&target.uri, start, content).await {
            Ok(chars) => chars,
            Err(e) => {
                self.undo_partial_stream(&mut snapshots, &target.uri, &before)
                    .await;
                return Err(e);
            }
        };

        let after = self.host.read_document(&target.uri).await?;
        snapshots.record(&target.uri, &after);
        drop(snapshots);

        self.notify(action, &target.uri);
        Ok(ActionOutcome::Streamed {
            document_uri: target.uri,
            chars,
        })
    }

    /// Inserts `content` one character at a time from `start`.
    async fn write_chars(&self, uri: &str, start: Position, content: &str) -> Result<usize> {
        let mut position = start;
        let mut chars = 0;
        let mut buffer = [0u8; 4];
        for ch in content.chars() {
            let piece = ch.encode_utf8(&mut buffer);
            self.host
                .replace_range(uri, TextRange::caret(position), piece)
                .await?;
            position = position.advance(piece);
            chars += 1;
            if !self.stream_char_delay.is_zero() {
                tokio::time::sleep(self.stream_char_delay).await;
            }
        }
        Ok(chars)
    }

    /// Puts a document back to `before` after a stream broke off. If the host
    /// refuses that too, the partial text is recorded so `rollback` can still
    /// reach `before`.
    async fn undo_partial_stream(&self, snapshots: &mut SnapshotStore, uri: &str, before: &str) {
        match self.host.set_text(uri, before).await {
            Ok(()) => {
                tracing::warn!("[ActionExecutor] Stream into {} failed; reverted", uri);
            }
            Err(restore_err) => {
                tracing::error!(
                    "[ActionExecutor] Stream into {} failed and could not be reverted: {}",
                    uri,
                    restore_err
                );
                if let Ok(partial) = self.host.read_document(uri).await {
                    snapshots.record_if_changed(uri, &partial);
                }
            }
        }
    }

    /// Snapshot, replace, snapshot.
    async fn commit(&self, uri: &str, range: TextRange, content: &str) -> Result<()> {
        let mut snapshots = self.snapshots.lock().await;
        let before = self.host.read_document(uri).await?;
        if range.to_byte_range(&before).is_none() {
            return Err(QuillError::document(format!(
                "range {}:{}-{}:{} is outside {}",
                range.start.line, range.start.character, range.end.line, range.end.character, uri
            )));
        }
        snapshots.record_if_changed(uri, &before);
        self.host.replace_range(uri, range, content).await?;
        let after = self.host.read_document(uri).await?;
        snapshots.record(uri, &after);
        Ok(())
    }

    async fn resolve_target(&self, action: &DocumentAction) -> Result<Target> {
        let active = self.host.active_document().await?;

        match (&action.target_document_id, active) {
            (Some(uri), Some(active)) if *uri == active.uri || *uri == active.display_name => {
                Ok(Target {
                    default_range: active_range(&active.selection, active.caret),
                    uri: active.uri,
                })
            }
            (Some(uri), _) => {
                let text = self.host.read_document(uri).await?;
                Ok(Target {
                    uri: uri.clone(),
                    default_range: TextRange::caret(end_position(&text)),
                })
            }
            (None, Some(active)) => Ok(Target {
                default_range: active_range(&active.selection, active.caret),
                uri: active.uri,
            }),
            (None, None) => Err(QuillError::document(format!(
                "{} action needs an open document",
                action.kind
            ))),
        }
    }

    async fn available_name(&self, stem: &str, extension: &str) -> Result<String> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = if attempt == 1 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}-{}.{}", stem, attempt, extension)
            };
            if !self.host.document_exists(&name).await? {
                return Ok(name);
            }
        }
        Err(QuillError::document(format!(
            "no free file name for {}.{}",
            stem, extension
        )))
    }

    fn notify(&self, action: &DocumentAction, document_uri: &str) {
        let reasoning = action.reasoning.as_deref().unwrap_or("");
        tracing::info!(
            target: ACTION_TARGET,
            kind = action.kind.as_str(),
            agent_id = %action.origin_agent_id,
            document = %document_uri,
            reasoning = %reasoning,
            "Document action executed"
        );

        if let Some(sender) = &self.notifier {
            let _ = sender.send(ActionNotification {
                kind: action.kind,
                agent_id: action.origin_agent_id.clone(),
                reasoning: action.reasoning.clone(),
                document_uri: document_uri.to_string(),
            });
        }
    }
}

fn active_range(selection: &Option<TextRange>, caret: Position) -> TextRange {
    selection
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| TextRange::caret(caret))
}

fn end_position(text: &str) -> Position {
    let line = text.matches('\n').count();
    let last = text.rsplit('\n').next().unwrap_or("");
    Position::new(line, last.chars().count())
}

/// File extension implied by the shape of `content`.
///
/// Screenplay markers win over markdown headings, which win over chapter
/// markers. Anything else is plain text.
pub fn infer_extension(content: &str) -> &'static str {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();

    let screenplay = lines.iter().any(|line| {
        ["INT.", "EXT.", "INT/EXT", "I/E "]
            .iter()
            .any(|marker| line.starts_with(marker))
            || line.contains("FADE IN:")
    });
    if screenplay {
        return "fountain";
    }

    let markdown = lines.iter().any(|line| {
        let hashes = line.chars().take_while(|c| *c == '#').count();
        (1..=6).contains(&hashes) && line[hashes..].starts_with(' ')
    });
    if markdown {
        return "md";
    }

    let chapters = lines.iter().any(|line| {
        line.to_ascii_lowercase()
            .strip_prefix("chapter ")
            .is_some_and(|rest| !rest.trim().is_empty())
    });
    if chapters {
        return "novel";
    }

    "txt"
}

/// File-name stem taken from the first heading or title line.
pub fn name_stem(content: &str) -> String {
    let first = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    let title = first.trim_start_matches('#').trim();
    let title = title
        .strip_prefix("Title:")
        .map(str::trim)
        .unwrap_or(title);

    let mut stem = String::new();
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            stem.extend(ch.to_lowercase());
        } else if !stem.is_empty() && !stem.ends_with('-') {
            stem.push('-');
        }
        if stem.chars().count() >= 48 {
            break;
        }
    }
    let stem = stem.trim_end_matches('-');
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem.to_string()
    }
}
