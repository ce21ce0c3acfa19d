use quill_application::ActionExecutor;
use quill_core::config::ExecutorConfig;
use quill_core::document::{ActionKind, DocumentAction, TextRange};
use quill_execution::ActionEventLayer;
use quill_infrastructure::InMemoryDocumentHost;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[tokio::test(flavor = "current_thread")]
async fn executor_actions_reach_the_layer() {
    let (layer, mut events) = ActionEventLayer::channel();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));

    let host = Arc::new(InMemoryDocumentHost::new().with_active("notes.md", "# Notes\nold\n"));
    let executor = ActionExecutor::with_config(
        host.clone(),
        &ExecutorConfig {
            stream_char_delay_ms: 0,
        },
    );

    executor
        .execute(
            &DocumentAction::new(ActionKind::Apply, "june")
                .with_range(TextRange::from_line_spec("2").unwrap())
                .with_content("new\n")
                .with_reasoning("freshen"),
        )
        .await
        .unwrap();
    executor
        .execute(&DocumentAction::new(ActionKind::Suggest, "june").with_content("later"))
        .await
        .unwrap();
    executor
        .execute(&DocumentAction::new(ActionKind::Rollback, "user"))
        .await
        .unwrap();

    let applied = events.try_recv().unwrap();
    assert_eq!(applied.kind, "apply");
    assert_eq!(applied.agent_id, "june");
    assert_eq!(applied.document, "mem://notes.md");
    assert_eq!(applied.reasoning, "freshen");

    let rolled_back = events.try_recv().unwrap();
    assert_eq!(rolled_back.kind, "rollback");
    assert_eq!(rolled_back.agent_id, "user");
    assert!(events.try_recv().is_err());
    assert_eq!(host.text_of("mem://notes.md").unwrap(), "# Notes\nold\n");
}
