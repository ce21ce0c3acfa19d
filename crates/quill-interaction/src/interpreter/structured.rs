use super::{InterpretContext, InterpreterStrategy};
use quill_core::document::{ActionKind, DocumentAction, TextRange};
use serde::Deserialize;

/// Reads a JSON array of actions embedded anywhere in the reply.
///
/// The array is taken from the first `[` to the last `]`. Elements without
/// a recognized `type` are skipped. A range that is malformed or falls
/// outside the current document discards the whole array.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredActionStrategy;

#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    range: Option<RawRange>,
    #[serde(default, alias = "document", alias = "target")]
    target_document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRange {
    Spec(String),
    Line(usize),
}

impl RawRange {
    fn to_range(&self) -> Option<TextRange> {
        match self {
            RawRange::Spec(spec) => TextRange::from_line_spec(spec),
            RawRange::Line(line) => TextRange::from_line_spec(&line.to_string()),
        }
    }
}

/// Slice from the first `[` to the last `]`, if both exist in that order.
pub(crate) fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

impl InterpreterStrategy for StructuredActionStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn interpret(&self, text: &str, ctx: &InterpretContext<'_>) -> Option<Vec<DocumentAction>> {
        let json = extract_json_array(text)?;
        let elements: Vec<serde_json::Value> = match serde_json::from_str(json) {
            Ok(elements) => elements,
            Err(e) => {
                tracing::debug!("Reply contains no valid action array: {}", e);
                return None;
            }
        };

        let mut actions = Vec::with_capacity(elements.len());
        for element in elements {
            let raw: RawAction = match serde_json::from_value(element) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::debug!("Skipping action element: {}", e);
                    continue;
                }
            };
            let Some(kind) = ActionKind::parse(&raw.kind) else {
                tracing::debug!(kind = %raw.kind, "Skipping unknown action type");
                continue;
            };

            let mut action = DocumentAction::new(kind, ctx.agent_id);
            action.content = raw.content;
            action.reasoning = raw.reasoning;
            action.target_document_id = raw.target_document_id;

            if let Some(raw_range) = raw.range {
                let range = raw_range.to_range()?;
                let line_count = ctx.line_count?;
                if !range.fits_line_count(line_count) {
                    tracing::debug!(
                        start = range.start.line,
                        end = range.end.line,
                        line_count,
                        "Action range falls outside the document"
                    );
                    return None;
                }
                action.range = Some(range);
            }
            actions.push(action);
        }
        Some(actions)
    }
}
