use super::templates;
use super::{InterpretContext, InterpreterStrategy};
use quill_core::document::{ActionKind, DocumentAction};
use quill_core::intent::IntentTable;

/// Synthesizes a `create` action when the text talks about producing a document.
#[derive(Debug, Clone, Default)]
pub struct CreationIntentStrategy {
    table: IntentTable,
}

impl CreationIntentStrategy {
    pub fn new(table: IntentTable) -> Self {
        Self { table }
    }
}

impl InterpreterStrategy for CreationIntentStrategy {
    fn name(&self) -> &'static str {
        "creation_intent"
    }

    fn interpret(&self, text: &str, ctx: &InterpretContext<'_>) -> Option<Vec<DocumentAction>> {
        if !self.table.has_creation_intent(text) {
            return None;
        }
        let kind = self.table.template_for(text);
        let action = DocumentAction::new(ActionKind::Create, ctx.agent_id)
            .with_content(templates::skeleton(kind))
            .with_reasoning(format!(
                "The conversation asked for a {}; starting from a skeleton.",
                templates::label(kind)
            ));
        Some(vec![action])
    }
}
