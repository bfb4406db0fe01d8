//! Integration tests for the REST client

use nnte::config::ClientConfig;
use nnte::error::ApiError;
use nnte::models::{Rule, RuleId};
use nnte::services::{RestApiClient, RuleStore, SignalSource, API_KEY_HEADER};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::test_utils::{config_json, TestBackend, API_KEY};

#[tokio::test]
async fn requests_carry_api_key_and_json_content_type() {
    let backend = TestBackend::new().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .and(header(API_KEY_HEADER, API_KEY))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_json()))
        .expect(1)
        .mount(&backend.server)
        .await;

    let config = backend.client.fetch_config().await.expect("config fetch");
    assert_eq!(config.timeframes().len(), 2);
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/backend/api/signals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let metrics = Arc::new(nnte::metrics::Metrics::new().unwrap());
    let config = ClientConfig::new(&format!("{}/backend", server.uri()), API_KEY).unwrap();
    let client = RestApiClient::new(&config, metrics).unwrap();

    let signals = client.fetch_signals().await.unwrap();
    assert!(signals.is_empty());
}

#[tokio::test]
async fn reads_retry_server_errors() {
    let backend = TestBackend::with_retries(2).await;
    Mock::given(method("GET"))
        .and(path("/api/rules"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&backend.server)
        .await;
    backend.mount_rules(json!([])).await;

    let rules = backend.client.list_rules().await.expect("retry should succeed");
    assert!(rules.is_empty());
    assert_eq!(backend.requests("GET", "/api/rules").await.len(), 2);
}

#[tokio::test]
async fn reads_do_not_retry_client_errors() {
    let backend = TestBackend::with_retries(2).await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&backend.server)
        .await;

    match backend.client.fetch_config().await {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("expected status error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn writes_are_sent_once() {
    let backend = TestBackend::with_retries(2).await;
    Mock::given(method("POST"))
        .and(path("/api/rules"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&backend.server)
        .await;

    let draft = Rule::draft("X", "BUY", Vec::new());
    let err = backend.client.create_rule(&draft).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }));
    assert_eq!(
        backend
            .metrics
            .api_requests_total
            .with_label_values(&["POST"])
            .get(),
        1
    );
}

#[tokio::test]
async fn rule_id_is_a_path_segment() {
    let backend = TestBackend::new().await;
    Mock::given(method("DELETE"))
        .and(path("/api/rules/r-5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&backend.server)
        .await;

    backend
        .client
        .delete_rule(&RuleId::Text("r-5".to_string()))
        .await
        .expect("delete");
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let backend = TestBackend::new().await;
    Mock::given(method("GET"))
        .and(path("/api/signals"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&backend.server)
        .await;

    let err = backend.client.fetch_signals().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
    assert!(!err.is_transient());
}
