//! Per-document snapshot history.
//!
//! Histories are append-only except for [`SnapshotStore::discard_latest`].
//! A rollback peeks at [`SnapshotStore::previous`], writes it to the host,
//! and only then discards the latest entry.

use quill_core::document::Snapshot;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SnapshotStore {
    histories: HashMap<String, Vec<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot of `content` unconditionally.
    pub fn record(&mut self, document_id: &str, content: &str) -> Snapshot {
        let snapshot = Snapshot::capture(document_id, content);
        self.histories
            .entry(document_id.to_string())
            .or_default()
            .push(snapshot.clone());
        snapshot
    }

    /// Appends a snapshot unless the latest one already holds `content`.
    pub fn record_if_changed(&mut self, document_id: &str, content: &str) -> Option<Snapshot> {
        if self.latest(document_id).is_some_and(|s| s.content == content) {
            return None;
        }
        Some(self.record(document_id, content))
    }

    pub fn latest(&self, document_id: &str) -> Option<&Snapshot> {
        self.histories.get(document_id).and_then(|h| h.last())
    }

    pub fn history(&self, document_id: &str) -> &[Snapshot] {
        self.histories
            .get(document_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self, document_id: &str) -> usize {
        self.history(document_id).len()
    }

    pub fn find(&self, document_id: &str, snapshot_id: &str) -> Option<&Snapshot> {
        self.history(document_id).iter().find(|s| s.id == snapshot_id)
    }

    /// The second-most-recent snapshot, if there are at least two.
    pub fn previous(&self, document_id: &str) -> Option<&Snapshot> {
        let history = self.history(document_id);
        history.len().checked_sub(2).map(|i| &history[i])
    }

    /// Drops the latest snapshot. Never empties a history.
    pub fn discard_latest(&mut self, document_id: &str) {
        match self.histories.get_mut(document_id) {
            Some(history) if history.len() > 1 => {
                history.pop();
            }
            _ => {}
        }
    }
}
