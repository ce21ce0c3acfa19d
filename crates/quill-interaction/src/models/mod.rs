//! [`LanguageModel`](quill_core::llm::LanguageModel) adapters.

mod openai_compatible;
mod scripted;

pub use openai_compatible::OpenAiCompatibleModel;
pub use scripted::ScriptedModel;
