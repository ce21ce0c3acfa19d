//! Document domain module.
//!
//! Types shared by the response interpreter and the action executor:
//! positions and ranges, the typed `DocumentAction`, snapshots, and the
//! document-host collaborator traits.

mod action;
mod host;
mod range;
mod snapshot;

pub use action::{ActionKind, DocumentAction};
pub use host::{ActiveDocument, DocumentHost, DocumentLookup, WorkspaceFile};
pub use range::{Position, TextRange, line_count};
pub use snapshot::Snapshot;
