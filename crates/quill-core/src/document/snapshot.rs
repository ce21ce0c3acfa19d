use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded state of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn capture(document_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
