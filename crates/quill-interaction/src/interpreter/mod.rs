//! Reply interpretation.
//!
//! A [`ResponseInterpreter`] runs an ordered list of strategies. The first
//! one is the primary path and its result wins; every later strategy is
//! still evaluated and may add actions of a kind the primary path did not
//! produce. Malformed replies never fail: they yield no actions.

mod creation;
mod structured;
pub mod templates;

pub use creation::CreationIntentStrategy;
pub use structured::StructuredActionStrategy;

use quill_core::document::DocumentAction;
use quill_core::intent::IntentTable;

/// Facts about the turn an interpretation runs in.
#[derive(Debug, Clone, Copy)]
pub struct InterpretContext<'a> {
    /// Persona credited with the resulting actions.
    pub agent_id: &'a str,
    /// Line count of the current document, if one is open.
    pub line_count: Option<usize>,
}

impl<'a> InterpretContext<'a> {
    pub fn new(agent_id: &'a str, line_count: Option<usize>) -> Self {
        Self {
            agent_id,
            line_count,
        }
    }
}

/// One way of reading actions out of reply text.
///
/// `None` means the strategy found nothing it recognizes; `Some(vec![])`
/// means it parsed the reply and found no actions.
pub trait InterpreterStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn interpret(&self, text: &str, ctx: &InterpretContext<'_>) -> Option<Vec<DocumentAction>>;
}

pub struct ResponseInterpreter {
    strategies: Vec<Box<dyn InterpreterStrategy>>,
}

impl ResponseInterpreter {
    pub fn new(strategies: Vec<Box<dyn InterpreterStrategy>>) -> Self {
        Self { strategies }
    }

    /// Structured JSON actions first, creation intent as the fallback.
    pub fn standard() -> Self {
        Self::with_intents(IntentTable::standard())
    }

    pub fn with_intents(table: IntentTable) -> Self {
        Self::new(vec![
            Box::new(StructuredActionStrategy),
            Box::new(CreationIntentStrategy::new(table)),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs every strategy. Fallback actions are added only for kinds the
    /// primary strategy did not produce.
    pub fn interpret(&self, text: &str, ctx: &InterpretContext<'_>) -> Vec<DocumentAction> {
        let mut actions = self.interpret_primary(text, ctx);
        for extra in self.fallback_actions(text, ctx) {
            if !actions.iter().any(|a| a.kind == extra.kind) {
                actions.push(extra);
            }
        }
        actions
    }

    /// Runs only the primary strategy.
    pub fn interpret_primary(&self, text: &str, ctx: &InterpretContext<'_>) -> Vec<DocumentAction> {
        let Some(primary) = self.strategies.first() else {
            return Vec::new();
        };
        match primary.interpret(text, ctx) {
            Some(actions) => actions,
            None => {
                tracing::debug!(strategy = primary.name(), "No structured actions in reply");
                Vec::new()
            }
        }
    }

    /// Runs every strategy after the primary one, in order.
    pub fn fallback_actions(&self, text: &str, ctx: &InterpretContext<'_>) -> Vec<DocumentAction> {
        let mut actions = Vec::new();
        for strategy in self.strategies.iter().skip(1) {
            if let Some(found) = strategy.interpret(text, ctx) {
                tracing::debug!(
                    strategy = strategy.name(),
                    count = found.len(),
                    "Fallback strategy produced actions"
                );
                actions.extend(found);
            }
        }
        actions
    }
}

impl Default for ResponseInterpreter {
    fn default() -> Self {
        Self::standard()
    }
}
