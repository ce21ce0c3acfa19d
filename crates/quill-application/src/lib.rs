//! Application layer: the services that drive a writers'-room session.
//!
//! The [`ConversationOrchestrator`] ties the pieces together:
//! user message → [`TurnScheduler`] → [`ContextBuilder`](quill_interaction::ContextBuilder)
//! → language model → [`ResponseInterpreter`](quill_interaction::ResponseInterpreter)
//! → [`ActionExecutor`] → [`SessionStore`].

pub mod executor;
pub mod orchestrator;
pub mod roster;
pub mod scheduler;
pub mod session_store;
pub mod snapshot_store;

pub use executor::{
    ActionExecutor, ActionNotification, ActionOutcome, PendingSuggestion, RollbackOutcome,
};
pub use orchestrator::{ConversationOrchestrator, DiscussionReport, TurnReport};
pub use roster::AgentRoster;
pub use scheduler::{Selection, TurnScheduler};
pub use session_store::SessionStore;
pub use snapshot_store::SnapshotStore;
