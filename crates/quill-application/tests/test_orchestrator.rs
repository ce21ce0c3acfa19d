mod common;

use common::{
    FailingModel, FlakySessionRepository, GatedModel, StalledModel, harness,
    harness_with_repository, presets, profile,
};
use quill_application::ActionOutcome;
use quill_core::session::MessageKind;
use quill_infrastructure::InMemoryDocumentHost;
use quill_interaction::ScriptedModel;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn created(outcomes: &[ActionOutcome]) -> Vec<(String, String)> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            ActionOutcome::Created { document_uri, name } => {
                Some((document_uri.clone(), name.clone()))
            }
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn addressed_message_routes_to_single_agent() {
    let model = Arc::new(ScriptedModel::echoing("On it."));
    let h = harness(model.clone(), presets(), InMemoryDocumentHost::new()).await;

    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "Aaron, fix this line")
        .await
        .unwrap();

    assert!(report.addressed);
    assert_eq!(report.respondents, vec!["aaron"]);
    let prompts = model.prompts().await;
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, "aaron");

    let session = h.orchestrator.sessions().get(&h.session_id).await.unwrap();
    let kinds: Vec<MessageKind> = session.messages.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![MessageKind::User, MessageKind::Agent]);
    assert_eq!(session.messages[1].agent_display_name, "Aaron Brooks");
}

#[tokio::test]
async fn unaddressed_message_goes_to_small_ensemble() {
    let model = Arc::new(ScriptedModel::echoing("Hmm."));
    let h = harness(model.clone(), presets(), InMemoryDocumentHost::new()).await;

    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "fix this line")
        .await
        .unwrap();

    assert!(!report.addressed);
    assert!((2..=3).contains(&report.respondents.len()));
    let distinct: HashSet<&String> = report.respondents.iter().collect();
    assert_eq!(distinct.len(), report.respondents.len());
    assert_eq!(model.call_count().await, report.respondents.len());
}

#[tokio::test]
async fn model_failure_is_recorded_and_other_turns_continue() {
    let model = Arc::new(ScriptedModel::echoing("Fine by me."));
    model.push_failure("a", "rate limited").await;
    let agents = vec![profile("a", "Ava Stone"), profile("b", "Ben Cole")];
    let h = harness(model.clone(), agents, InMemoryDocumentHost::new()).await;

    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "thoughts on the cold open?")
        .await
        .unwrap();

    assert_eq!(report.respondents.len(), 2);
    assert_eq!(report.failures, vec!["a"]);

    let session = h.orchestrator.sessions().get(&h.session_id).await.unwrap();
    assert!(session.messages.iter().any(|m| {
        m.kind == MessageKind::System && m.content.starts_with("Ava Stone could not respond")
    }));
    assert!(
        session
            .messages
            .iter()
            .any(|m| m.kind == MessageKind::Agent && m.agent_id == "b")
    );
}

#[tokio::test]
async fn creation_intent_yields_exactly_one_outline() {
    let host = InMemoryDocumentHost::new().with_active("kitchen.fountain", "INT. KITCHEN - DAY");
    let h = harness(Arc::new(FailingModel), presets(), host).await;

    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "let's create an outline for this")
        .await
        .unwrap();

    let created = created(&report.outcomes);
    assert_eq!(created.len(), 1);
    let (uri, name) = &created[0];
    assert_eq!(name, "story-outline.md");
    assert!(h.host.text_of(uri).unwrap().contains("# Story Outline"));
    assert_eq!(h.host.opened(), vec![uri.clone()]);
    assert_eq!(h.host.text_of("mem://kitchen.fountain").unwrap(), "INT. KITCHEN - DAY");
}

#[tokio::test]
async fn chatty_replies_still_create_only_once() {
    let model = Arc::new(ScriptedModel::echoing("Sure, I'll write the outline with you."));
    let host = InMemoryDocumentHost::new().with_active("kitchen.fountain", "INT. KITCHEN - DAY");
    let h = harness(model, presets(), host).await;

    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "let's create an outline for this")
        .await
        .unwrap();

    assert_eq!(created(&report.outcomes).len(), 1);
}

#[tokio::test]
async fn earlier_creation_intent_does_not_repeat_on_later_messages() {
    let model = Arc::new(ScriptedModel::echoing("Act two sags a little."));
    let h = harness(model, presets(), InMemoryDocumentHost::new()).await;

    let first = h
        .orchestrator
        .handle_user_message(&h.session_id, "let's create an outline for this")
        .await
        .unwrap();
    let second = h
        .orchestrator
        .handle_user_message(&h.session_id, "how is the middle?")
        .await
        .unwrap();

    assert_eq!(created(&first.outcomes).len(), 1);
    assert!(created(&second.outcomes).is_empty());
}

#[tokio::test]
async fn structured_create_suppresses_synthesized_one() {
    let model = Arc::new(ScriptedModel::new());
    model
        .push_reply(
            "aaron",
            r##"Here you go. [{"type": "create", "content": "# Pilot Beats\n\n- Rosa opens the diner", "reasoning": "asked for beats"}]"##,
        )
        .await;
    let h = harness(model, presets(), InMemoryDocumentHost::new()).await;

    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "Aaron, write the beats as an outline")
        .await
        .unwrap();

    let created = created(&report.outcomes);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].1, "pilot-beats.md");

    let session = h.orchestrator.sessions().get(&h.session_id).await.unwrap();
    let audit = session
        .messages
        .iter()
        .find(|m| m.kind == MessageKind::System && m.content.contains("created pilot-beats.md"))
        .unwrap();
    assert!(audit.content.contains("Reasoning: asked for beats"));
    assert!(audit.content.contains("- Rosa opens the diner"));
}

#[tokio::test]
async fn structured_apply_edits_the_active_document() {
    let model = Arc::new(ScriptedModel::new());
    model
        .push_reply(
            "theo",
            r#"Tighter: [{"type": "apply", "range": "2-2", "content": "Rosa slams the till.\n"}]"#,
        )
        .await;
    let host =
        InMemoryDocumentHost::new().with_active("diner.fountain", "INT. DINER - NIGHT\nRosa wipes the counter slowly.\nEnd.");
    let h = harness(model, presets(), host).await;

    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "Theo, tighten line two")
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(
        h.host.text_of("mem://diner.fountain").unwrap(),
        "INT. DINER - NIGHT\nRosa slams the till.\nEnd."
    );
    assert_eq!(
        h.orchestrator
            .executor()
            .snapshot_history("mem://diner.fountain")
            .await
            .len(),
        2
    );
}

#[tokio::test]
async fn discussion_runs_agents_times_rounds_turns() {
    let model = Arc::new(ScriptedModel::echoing("Pacing feels slow in act two."));
    let agents = vec![profile("a", "Ava Stone"), profile("b", "Ben Cole")];
    let h = harness(model.clone(), agents, InMemoryDocumentHost::new()).await;

    let ids = vec!["a".to_string(), "b".to_string()];
    let report = h
        .orchestrator
        .start_discussion(&h.session_id, &ids, "pacing", Some(3))
        .await
        .unwrap();

    assert_eq!(report.rounds_completed, 3);
    assert_eq!(report.turns_attempted, 6);
    assert!(!report.stopped_early);

    let order: Vec<String> = model.prompts().await.into_iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec!["a", "b", "a", "b", "a", "b"]);
    assert!(!h.orchestrator.is_discussion_active(&h.session_id));
    assert!(!h.orchestrator.is_busy(&h.session_id));
}

#[tokio::test]
async fn discussion_defaults_to_configured_rounds() {
    let model = Arc::new(ScriptedModel::echoing("ok"));
    let agents = vec![profile("a", "Ava Stone"), profile("b", "Ben Cole")];
    let h = harness(model.clone(), agents, InMemoryDocumentHost::new()).await;
    h.config.update(|c| c.scheduler.max_rounds = 2);

    let ids = vec!["a".to_string(), "b".to_string()];
    let report = h
        .orchestrator
        .start_discussion(&h.session_id, &ids, "the ending", None)
        .await
        .unwrap();

    assert_eq!(report.turns_attempted, 4);
    assert_eq!(model.call_count().await, 4);
}

#[tokio::test]
async fn discussion_prompts_carry_the_topic() {
    let model = Arc::new(ScriptedModel::echoing("ok"));
    let agents = vec![profile("a", "Ava Stone"), profile("b", "Ben Cole")];
    let h = harness(model.clone(), agents, InMemoryDocumentHost::new()).await;

    let ids = vec!["a".to_string(), "b".to_string()];
    h.orchestrator
        .start_discussion(&h.session_id, &ids, "pacing", Some(1))
        .await
        .unwrap();

    let prompts = model.prompts().await;
    assert!(prompts[0].1.contains("Discussion topic: pacing (round 1 of 1)"));
    // Ben sees Ava's reply but not his own.
    assert!(prompts[1].1.contains("Ava Stone: ok"));
}

#[tokio::test]
async fn discussion_with_one_agent_is_rejected_before_any_call() {
    let model = Arc::new(ScriptedModel::echoing("ok"));
    let agents = vec![profile("a", "Ava Stone"), profile("b", "Ben Cole")];
    let h = harness(model.clone(), agents, InMemoryDocumentHost::new()).await;

    let err = h
        .orchestrator
        .start_discussion(&h.session_id, &["a".to_string()], "pacing", Some(3))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = h
        .orchestrator
        .start_discussion(&h.session_id, &["a".to_string(), "zed".to_string()], "pacing", None)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(model.call_count().await, 0);
}

#[tokio::test]
async fn stop_halts_before_the_next_turn() {
    let model = Arc::new(GatedModel::new(3));
    let agents = vec![profile("a", "Ava Stone"), profile("b", "Ben Cole")];
    let h = harness(model.clone(), agents, InMemoryDocumentHost::new()).await;

    let orchestrator = h.orchestrator.clone();
    let session_id = h.session_id.clone();
    let discussion = tokio::spawn(async move {
        let ids = vec!["a".to_string(), "b".to_string()];
        orchestrator
            .start_discussion(&session_id, &ids, "pacing", Some(3))
            .await
    });

    // Third turn (round two, agent a) is in flight.
    model.reached.notified().await;
    assert!(h.orchestrator.is_discussion_active(&h.session_id));
    assert!(h.orchestrator.stop_discussion(&h.session_id));
    model.release.notify_one();

    let report = discussion.await.unwrap().unwrap();
    assert!(report.stopped_early);
    assert_eq!(report.turns_attempted, 3);
    assert_eq!(report.rounds_completed, 1);
    assert_eq!(model.calls(), 3);
    assert!(!h.orchestrator.stop_discussion(&h.session_id));
}

#[tokio::test]
async fn overlapping_pass_is_rejected_not_queued() {
    let model = Arc::new(GatedModel::new(1));
    let agents = vec![profile("a", "Ava Stone"), profile("b", "Ben Cole")];
    let h = harness(model.clone(), agents, InMemoryDocumentHost::new()).await;

    let orchestrator = h.orchestrator.clone();
    let session_id = h.session_id.clone();
    let first = tokio::spawn(async move {
        orchestrator
            .handle_user_message(&session_id, "Ava, what's next?")
            .await
    });

    model.reached.notified().await;
    let err = h
        .orchestrator
        .handle_user_message(&h.session_id, "Ben, anything?")
        .await
        .unwrap_err();
    assert!(err.is_busy());
    model.release.notify_one();

    first.await.unwrap().unwrap();
    let retry = h
        .orchestrator
        .handle_user_message(&h.session_id, "Ben, anything?")
        .await
        .unwrap();
    assert_eq!(retry.respondents, vec!["b"]);
}

#[tokio::test]
async fn addressing_unknown_or_inactive_agent_is_validation() {
    let model = Arc::new(ScriptedModel::echoing("ok"));
    let h = harness(model.clone(), presets(), InMemoryDocumentHost::new()).await;

    let err = h
        .orchestrator
        .address_agent(&h.session_id, "ghost", "hello?")
        .await
        .unwrap_err();
    assert!(err.is_validation());

    h.config.update(|c| c.set_agent_active("june", false));
    let err = h
        .orchestrator
        .address_agent(&h.session_id, "june", "hello?")
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(model.call_count().await, 0);

    let report = h
        .orchestrator
        .address_agent(&h.session_id, "mira", "hello?")
        .await
        .unwrap();
    assert_eq!(report.respondents, vec!["mira"]);
}

#[tokio::test]
async fn deactivated_agent_is_not_scheduled_on_next_turn() {
    let model = Arc::new(ScriptedModel::echoing("ok"));
    let h = harness(model.clone(), presets(), InMemoryDocumentHost::new()).await;

    h.config.update(|c| c.set_agent_active("aaron", false));
    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "Aaron, fix this line")
        .await
        .unwrap();

    assert!(!report.addressed);
    assert!(!report.respondents.contains(&"aaron".to_string()));
}

#[tokio::test]
async fn stalled_model_times_out_into_system_message() {
    let h = harness(Arc::new(StalledModel), presets(), InMemoryDocumentHost::new()).await;
    h.config.update(|c| c.model.timeout_secs = 1);

    let report = h
        .orchestrator
        .handle_user_message(&h.session_id, "Mira, is the midpoint working?")
        .await
        .unwrap();

    assert_eq!(report.failures, vec!["mira"]);
    let session = h.orchestrator.sessions().get(&h.session_id).await.unwrap();
    let last = session.messages.last().unwrap();
    assert_eq!(last.kind, MessageKind::System);
    assert!(last.content.contains("timed out after 1s"));
}

#[tokio::test]
async fn read_request_pulls_document_into_prompt() {
    let model = Arc::new(ScriptedModel::echoing("Read it."));
    let host = InMemoryDocumentHost::new();
    host.insert("heist outline.md", "The vault opens at midnight.");
    let h = harness(model.clone(), presets(), host).await;

    h.orchestrator
        .handle_user_message(&h.session_id, "Mira, read the heist outline")
        .await
        .unwrap();

    let prompts = model.prompts().await;
    assert!(prompts[0].1.contains("# Referenced Documents"));
    assert!(prompts[0].1.contains("The vault opens at midnight."));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let h = harness(Arc::new(ScriptedModel::echoing("ok")), presets(), InMemoryDocumentHost::new()).await;
    let err = h
        .orchestrator
        .handle_user_message("missing", "hello")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!h.orchestrator.is_busy("missing"));
}

#[tokio::test]
async fn storage_failure_surfaces_before_any_model_call() {
    let model = Arc::new(ScriptedModel::echoing("On it."));
    let repository = Arc::new(FlakySessionRepository::default());
    let h = harness_with_repository(
        model.clone(),
        presets(),
        InMemoryDocumentHost::new(),
        repository.clone(),
    )
    .await;

    repository.fail_saves.store(true, Ordering::SeqCst);
    let err = h
        .orchestrator
        .handle_user_message(&h.session_id, "Aaron, fix this line")
        .await
        .unwrap_err();

    assert!(err.is_io(), "got {:?}", err);
    assert_eq!(model.call_count().await, 0);

    // The session is usable again once storage recovers.
    repository.fail_saves.store(false, Ordering::SeqCst);
    h.orchestrator
        .handle_user_message(&h.session_id, "Aaron, fix this line")
        .await
        .unwrap();
    assert_eq!(model.call_count().await, 1);
}
