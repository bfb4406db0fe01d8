//! Shared helpers for integration tests against a mock REST backend

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use nnte::config::ClientConfig;
use nnte::core::{Notice, NoticeBoard, RuleBuilder, RuleSynchronizer, SignalPoller};
use nnte::metrics::Metrics;
use nnte::services::RestApiClient;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const API_KEY: &str = "test-key";

/// Mock backend plus a client pointed at it
pub struct TestBackend {
    pub server: MockServer,
    pub client: Arc<RestApiClient>,
    pub metrics: Arc<Metrics>,
}

impl TestBackend {
    /// Client without read retries, so failure tests see one request
    pub async fn new() -> Self {
        Self::with_retries(0).await
    }

    pub async fn with_retries(read_retries: usize) -> Self {
        let server = MockServer::start().await;
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
        let config = ClientConfig::new(&server.uri(), API_KEY)
            .expect("client config")
            .with_read_retries(read_retries)
            .with_retry_min_delay(Duration::from_millis(10));
        let client = Arc::new(RestApiClient::new(&config, metrics.clone()).expect("http client"));
        Self {
            server,
            client,
            metrics,
        }
    }

    pub fn builder(&self) -> RuleBuilder {
        RuleBuilder::new(self.client.clone(), self.metrics.clone(), NoticeBoard::new())
    }

    pub fn synchronizer(&self) -> (Arc<RuleSynchronizer>, NoticeBoard) {
        let notices = NoticeBoard::new();
        let sync = Arc::new(RuleSynchronizer::new(
            self.client.clone(),
            self.metrics.clone(),
            notices.clone(),
        ));
        (sync, notices)
    }

    pub fn poller(&self) -> Arc<SignalPoller> {
        Arc::new(SignalPoller::new(
            self.client.clone(),
            self.client.clone(),
            self.metrics.clone(),
        ))
    }

    pub async fn mount_config(&self) {
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(config_json()))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_rules(&self, rules: Value) {
        Mock::given(method("GET"))
            .and(path("/api/rules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rules))
            .mount(&self.server)
            .await;
    }

    /// Requests received so far with the given method and path
    pub async fn requests(&self, verb: &str, route: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == route)
            .collect()
    }
}

/// Two timeframes, two operators, standard MACD parameters
pub fn config_json() -> Value {
    json!({
        "timeframes": ["1m", "5m"],
        "operators": [">", "<"],
        "macdValues": ["macd_line", "signal_line"],
        "macdParamsByTimeframe": {"1m": [[12, 26, 9]], "5m": [[12, 26, 9]]}
    })
}

pub fn indicator_json(value: &str) -> Value {
    json!({
        "type": "indicator",
        "source": "macd",
        "timeframe": "1m",
        "params": [12, 26, 9],
        "value": value,
        "offset": 0
    })
}

pub fn default_conditions_json() -> Value {
    json!([{
        "operand1": indicator_json("macd_line"),
        "operator": ">",
        "operand2": indicator_json("signal_line")
    }])
}

pub fn rule_json(id: i64, name: &str, telegram_enabled: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "signal": format!("{}_BUY", name.to_uppercase()),
        "conditions": default_conditions_json(),
        "telegram_enabled": telegram_enabled
    })
}

/// Responds with the request body, as a full-document PUT would
pub struct EchoBody;

impl Respond for EchoBody {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(request.body.clone(), "application/json")
    }
}

/// `EchoBody` answered after a fixed delay
pub struct DelayedEcho(pub Duration);

impl Respond for DelayedEcho {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        EchoBody.respond(request).set_delay(self.0)
    }
}

/// Next notice published on `rx`, failing the test if none arrives
pub async fn next_notice(rx: &mut broadcast::Receiver<Notice>) -> Notice {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("notice published")
        .expect("notice channel open")
}
