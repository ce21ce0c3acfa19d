//! Tracing layer that turns document-action events into [`ActionEvent`]s.
//!
//! The executor logs every mutating action under the `quill::action` target.
//! This layer picks those events out of the stream and forwards them to a
//! channel so a front end can render them next to the conversation.

use quill_application::executor::ACTION_TARGET;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One document action as seen on the tracing stream.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActionEvent {
    /// Action kind (`apply`, `create`, ...)
    pub kind: String,
    pub agent_id: String,
    pub document: String,
    /// Empty when the action carried no reasoning
    pub reasoning: String,
    /// Human-readable message
    pub message: String,
    /// Any other structured fields on the event
    pub fields: HashMap<String, Value>,
    pub timestamp: String,
}

/// Forwards `quill::action` events to a channel. Other targets are ignored.
pub struct ActionEventLayer {
    sender: mpsc::UnboundedSender<ActionEvent>,
}

impl ActionEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<ActionEvent>) -> Self {
        Self { sender }
    }

    /// Creates a layer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ActionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for ActionEventLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != ACTION_TARGET {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let mut take = |name: &str| match fields.remove(name) {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let action_event = ActionEvent {
            kind: take("kind"),
            agent_id: take("agent_id"),
            document: take("document"),
            reasoning: take("reasoning"),
            message: take("message"),
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Receiver gone means nobody is watching.
        let _ = self.sender.send(action_event);
    }
}

/// Collects event fields into a map.
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    // `%value` fields arrive here as Display wrapped in Debug.
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(format!("{:?}", value)));
    }
}
