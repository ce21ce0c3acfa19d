//! Interaction layer: everything that faces the language model.
//!
//! - [`context::ContextBuilder`] assembles the per-turn prompt.
//! - [`interpreter::ResponseInterpreter`] turns reply text into document actions.
//! - [`models`] holds the [`LanguageModel`](quill_core::llm::LanguageModel) adapters.

pub mod context;
pub mod interpreter;
pub mod models;
pub mod prompt;

pub use context::{ContextBuilder, TurnContext};
pub use interpreter::{
    CreationIntentStrategy, InterpretContext, InterpreterStrategy, ResponseInterpreter,
    StructuredActionStrategy,
};
pub use models::{OpenAiCompatibleModel, ScriptedModel};
