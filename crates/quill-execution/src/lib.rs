//! Runtime plumbing shared by Quill front ends: subscriber setup and the
//! action event stream.

pub mod action_layer;
pub mod logging;

pub use action_layer::{ActionEvent, ActionEventLayer};
pub use logging::{LogFormat, LogTarget, LoggingConfig, LoggingError, init_logging};
