//! Prompt in, actions out: the interaction layer on its own.

use quill_core::config::ContextConfig;
use quill_core::document::{ActionKind, ActiveDocument, Position, line_count};
use quill_core::llm::LanguageModel;
use quill_core::persona::get_default_presets;
use quill_core::session::Message;
use quill_interaction::{
    ContextBuilder, InterpretContext, ResponseInterpreter, ScriptedModel, TurnContext,
};

#[tokio::test]
async fn scripted_reply_becomes_ranged_suggestion() {
    let presets = get_default_presets();
    let theo = presets.iter().find(|p| p.id == "theo").unwrap();
    let document = ActiveDocument {
        uri: "mem://pilot.fountain".into(),
        display_name: "pilot.fountain".into(),
        text: "INT. DINER - NIGHT\nRosa wipes the counter.\nShe looks up.".into(),
        selection: None,
        caret: Position::default(),
    };
    let transcript = vec![Message::user("Theo, tighten line 2")];

    let builder = ContextBuilder::from_profiles(&presets);
    let prompt = builder.build(
        &TurnContext::new(theo, &transcript).with_document(Some(&document)),
        &ContextConfig::default(),
    );

    let model = ScriptedModel::new();
    model
        .push_reply(
            "theo",
            r#"Cut the filler. [{"type": "suggest", "range": "2", "content": "Rosa scrubs.", "reasoning": "shorter"}]"#,
        )
        .await;
    let reply = model.send(&prompt, "theo").await.unwrap();

    let interpreter = ResponseInterpreter::standard();
    let actions = interpreter.interpret(
        &reply.text,
        &InterpretContext::new("theo", Some(line_count(&document.text))),
    );

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Suggest);
    assert_eq!(actions[0].range.unwrap().start.line, 1);

    let (persona, seen) = &model.prompts().await[0];
    assert_eq!(persona, "theo");
    assert!(seen.contains("Theo Lindqvist"));
    assert!(seen.contains("Rosa wipes the counter."));
    assert!(seen.contains("You: Theo, tighten line 2"));
}

#[tokio::test]
async fn transcript_tail_drives_creation_fallback() {
    let transcript = [
        Message::user("We should outline the heist before we draft."),
        Message::agent("mira", "Mira Castellanos", "Agreed, three acts."),
    ];
    let text = transcript
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let interpreter = ResponseInterpreter::standard();
    let creates: Vec<_> = interpreter
        .fallback_actions(&text, &InterpretContext::new("system", None))
        .into_iter()
        .filter(|a| a.kind == ActionKind::Create)
        .collect();

    assert_eq!(creates.len(), 1);
    assert!(creates[0].content.as_deref().unwrap().starts_with("# Story Outline"));
}
