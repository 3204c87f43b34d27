//! Shipped configuration files load and drive a conversation

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::ScriptedLlm;
use convoform_config::{load_settings_from, ConfirmationStrategy};
use convoform_engine::{FieldType, FormEngine, FormState, SessionContext, Turn, TurnOutcome};
use serde_json::json;

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config")
}

#[test]
fn default_settings_file_is_valid() {
    let dir = config_dir();
    let settings = load_settings_from(dir.to_str().unwrap(), None).unwrap();

    assert!(settings.form.ask_confirm);
    assert_eq!(settings.form.confirmation_strategy, ConfirmationStrategy::Prompt);
    assert!(!settings.needs_embedder());
}

#[tokio::test]
async fn pizza_order_schema_runs_to_completion() {
    let llm = Arc::new(ScriptedLlm::new());
    let engine = FormEngine::new(llm.clone(), Default::default());
    let schema = engine
        .load_schema(config_dir().join("schemas/pizza_order.yaml"))
        .unwrap();

    assert_eq!(schema.field_names().collect::<Vec<_>>(), ["pizza_type", "address", "phone", "notes"]);
    assert_eq!(schema.get_field("phone").unwrap().field_type, FieldType::Phone);
    assert!(!schema.get_field("notes").unwrap().required);
    assert!(schema.has_examples());

    let mut session = SessionContext::new();
    llm.push_extraction(json!({"pizza_type": "marinara", "address": "Via Roma 12"}));
    let outcome = engine
        .start(&mut session, "pizza_order", &Turn::new("a marinara to Via Roma 12"))
        .await
        .unwrap();
    assert_eq!(outcome.reply(), Some("Could you tell me the phone?"));

    // optional notes are never asked for
    llm.push_extraction(json!({"phone": "+39 333 123 4567"}));
    let outcome = engine
        .handle_turn(&mut session, &Turn::new("+39 333 123 4567"))
        .await;
    assert!(outcome.reply().unwrap().contains("- pizza_type: Marinara"));
    assert_eq!(session.active().unwrap().state(), FormState::AskSummary);

    llm.push_confirmation("YES");
    let TurnOutcome::ActionCompleted { result, .. } = engine.handle_turn(&mut session, &Turn::new("yes")).await else {
        panic!("expected the action to run");
    };
    let values: serde_json::Value = serde_json::from_str(&result).unwrap();
    assert_eq!(values["pizza_type"], "Marinara");
    assert_eq!(values["address"], "Via Roma 12");
}
