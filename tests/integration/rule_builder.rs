//! Integration tests for the rule builder view
//!
//! Covers the initial load, create and update submits, and the failure paths
//! that must leave the form intact.

use nnte::core::{LoadState, NoticeLevel};
use nnte::error::{EditorError, SubmitError, ValidationError};
use nnte::models::RuleId;
use nnte::rules::EditorState;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::test_utils::{default_conditions_json, next_notice, rule_json, EchoBody, TestBackend};

#[tokio::test]
async fn load_fetches_config_and_rules() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend.mount_rules(json!([rule_json(1, "Cross", false)])).await;

    let builder = backend.builder();
    assert!(matches!(builder.load_state().await, LoadState::Loading));
    assert_eq!(
        builder.open_create().await.unwrap_err(),
        EditorError::NotLoaded
    );

    let config = builder.load().await.expect("load should succeed");
    assert_eq!(config.timeframes().len(), 2);
    assert!(matches!(builder.load_state().await, LoadState::Ready(_)));
    assert_eq!(builder.rules().await.len(), 1);

    // A second load only refreshes rules
    builder.load().await.unwrap();
    assert_eq!(backend.requests("GET", "/api/config").await.len(), 1);
    assert_eq!(backend.requests("GET", "/api/rules").await.len(), 2);
}

#[tokio::test]
async fn load_failure_is_reported() {
    let backend = TestBackend::new().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&backend.server)
        .await;
    backend.mount_rules(json!([])).await;

    let builder = backend.builder();
    assert!(builder.load().await.is_err());
    assert!(matches!(builder.load_state().await, LoadState::Failed(_)));
    assert!(builder.configuration().await.is_none());
}

#[tokio::test]
async fn submit_without_name_sends_nothing() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend.mount_rules(json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/rules"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&backend.server)
        .await;

    let builder = backend.builder();
    builder.load().await.unwrap();
    builder.open_create().await.unwrap();

    let err = builder.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SubmitError::Editor(EditorError::Validation(ValidationError::EmptyName))
    ));
    assert_eq!(builder.editor_state().await, Some(EditorState::Creating));
    assert!(backend.requests("POST", "/api/rules").await.is_empty());
}

#[tokio::test]
async fn create_posts_default_condition_once() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend.mount_rules(json!([])).await;

    let expected_body = json!({
        "name": "X",
        "signal": "BUY",
        "conditions": default_conditions_json(),
        "telegram_enabled": false
    });
    Mock::given(method("POST"))
        .and(path("/api/rules"))
        .and(body_json(expected_body))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 42,
            "name": "X",
            "signal": "BUY",
            "conditions": default_conditions_json(),
            "telegram_enabled": false
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let builder = backend.builder();
    let mut notices = builder.notices().subscribe();
    builder.load().await.unwrap();
    builder.open_create().await.unwrap();
    builder
        .with_editor(|editor| {
            editor.set_name("X")?;
            editor.set_signal("BUY")
        })
        .await
        .unwrap();

    let saved = builder.submit().await.expect("submit should succeed");
    assert_eq!(saved.id, Some(RuleId::Number(42)));
    assert_eq!(builder.editor_state().await, Some(EditorState::Hidden));

    let notice = next_notice(&mut notices).await;
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "New logic saved successfully!");
    assert_eq!(backend.requests("POST", "/api/rules").await.len(), 1);
}

#[tokio::test]
async fn update_keeps_telegram_flag() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend.mount_rules(json!([rule_json(3, "Cross", true)])).await;
    Mock::given(method("PUT"))
        .and(path("/api/rules/3"))
        .and(body_partial_json(json!({
            "id": 3,
            "name": "Renamed",
            "telegram_enabled": true
        })))
        .respond_with(EchoBody)
        .expect(1)
        .mount(&backend.server)
        .await;

    let builder = backend.builder();
    let mut notices = builder.notices().subscribe();
    builder.load().await.unwrap();
    builder.open_edit(&RuleId::Number(3)).await.unwrap();
    builder
        .with_editor(|editor| editor.set_name("Renamed"))
        .await
        .unwrap();

    let saved = builder.submit().await.expect("update should succeed");
    assert_eq!(saved.name, "Renamed");
    assert!(saved.telegram_enabled);

    let notice = next_notice(&mut notices).await;
    assert_eq!(notice.message, "Logic updated successfully!");
}

#[tokio::test]
async fn cancel_edit_sends_nothing() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend.mount_rules(json!([rule_json(3, "Cross", false)])).await;
    Mock::given(method("PUT"))
        .respond_with(EchoBody)
        .expect(0)
        .mount(&backend.server)
        .await;

    let builder = backend.builder();
    builder.load().await.unwrap();
    builder.open_edit(&RuleId::Number(3)).await.unwrap();
    builder
        .with_editor(|editor| editor.set_name("Scratch"))
        .await
        .unwrap();
    builder.cancel().await.unwrap();

    assert_eq!(builder.editor_state().await, Some(EditorState::Hidden));
    let rules = builder.rules().await;
    assert_eq!(rules[0].name, "Cross");
}

#[tokio::test]
async fn open_edit_of_unknown_rule_fails() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend.mount_rules(json!([])).await;

    let builder = backend.builder();
    builder.load().await.unwrap();
    assert_eq!(
        builder.open_edit(&RuleId::Number(9)).await.unwrap_err(),
        EditorError::UnknownRule(RuleId::Number(9))
    );
}

#[tokio::test]
async fn failed_create_keeps_form_open() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend.mount_rules(json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/rules"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&backend.server)
        .await;

    let builder = backend.builder();
    let mut notices = builder.notices().subscribe();
    builder.load().await.unwrap();
    builder.open_create().await.unwrap();
    builder
        .with_editor(|editor| {
            editor.set_name("X")?;
            editor.set_signal("BUY")?;
            editor.add_condition()
        })
        .await
        .unwrap();

    let err = builder.submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Sync(_)));
    assert_eq!(builder.editor_state().await, Some(EditorState::Creating));
    let form = builder.form().await.unwrap();
    assert_eq!(form.name, "X");
    assert_eq!(form.conditions.len(), 2);

    let notice = next_notice(&mut notices).await;
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Failed to save rule. Please try again.");
}

#[tokio::test]
async fn failed_update_returns_to_editing() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend.mount_rules(json!([rule_json(3, "Cross", false)])).await;
    Mock::given(method("PUT"))
        .and(path("/api/rules/3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&backend.server)
        .await;

    let builder = backend.builder();
    let mut notices = builder.notices().subscribe();
    builder.load().await.unwrap();
    builder.open_edit(&RuleId::Number(3)).await.unwrap();
    builder
        .with_editor(|editor| editor.set_name("Renamed"))
        .await
        .unwrap();

    let err = builder.submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Sync(_)));
    assert_eq!(
        builder.editor_state().await,
        Some(EditorState::Editing(RuleId::Number(3)))
    );
    assert_eq!(builder.form().await.unwrap().name, "Renamed");
    assert_eq!(builder.rules().await[0].name, "Cross");

    let notice = next_notice(&mut notices).await;
    assert_eq!(notice.level, NoticeLevel::Error);
}

#[tokio::test]
async fn load_skips_rules_with_unsupported_operands() {
    let backend = TestBackend::new().await;
    backend.mount_config().await;
    backend
        .mount_rules(json!([
            {
                "id": 7,
                "name": "Composite",
                "signal": "COMPOSITE_BUY",
                "conditions": [{
                    "operand1": {"type": "expression", "expr": "macd_line - signal_line"},
                    "operator": ">",
                    "operand2": {"type": "literal", "value": 0}
                }],
                "telegram_enabled": false
            },
            rule_json(3, "Cross", false)
        ]))
        .await;

    let builder = backend.builder();
    builder.load().await.expect("one bad rule should not fail the load");
    assert!(matches!(builder.load_state().await, LoadState::Ready(_)));

    let rules = builder.rules().await;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, Some(RuleId::Number(3)));
    assert_eq!(
        builder.open_edit(&RuleId::Number(7)).await.unwrap_err(),
        EditorError::UnknownRule(RuleId::Number(7))
    );
}
