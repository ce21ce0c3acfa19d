//! On-disk representations.
//!
//! Session DTOs are `Versioned` and loaded through a `version_migrate`
//! migrator, so the storage format can evolve without touching `quill-core`.

mod persona;
mod session;

pub use persona::PersonaFileV1;
pub use session::{MessageRecordV1, SESSION_ENTITY, SessionRecordV1, create_session_migrator};
