//! REST client for the rule store and signal endpoints

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::CONTENT_TYPE;
use prometheus::IntGauge;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::models::{Configuration, Rule, RuleId, RuleSummary, SignalsPayload};

use super::rule_store::{RuleStore, SignalSource};

pub const API_KEY_HEADER: &str = "X-API-KEY";

const CONFIG_PATH: &str = "api/config";
const SIGNALS_PATH: &str = "api/signals";
const RULES_PATH: &str = "api/rules";

/// Holds one slot of the in-flight gauge, released on drop so a request
/// future cancelled by a sibling in a join still gives it back
struct InFlightGuard(IntGauge);

impl InFlightGuard {
    fn enter(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// `reqwest` client bound to one base URL and API key.
///
/// Reads retry transient failures with exponential backoff; writes are sent
/// exactly once so their outcome can drive rollback.
#[derive(Clone)]
pub struct RestApiClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
    read_retries: usize,
    retry_min_delay: Duration,
    metrics: Arc<Metrics>,
}

impl RestApiClient {
    pub fn new(config: &ClientConfig, metrics: Arc<Metrics>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nnte/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(config, http, metrics))
    }

    pub fn with_client(config: &ClientConfig, http: reqwest::Client, metrics: Arc<Metrics>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            http,
            read_retries: config.read_retries,
            retry_min_delay: config.retry_min_delay,
            metrics,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn rule_endpoint(&self, id: &RuleId) -> Result<Url, ApiError> {
        let mut url = self.endpoint(RULES_PATH)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&id.to_string());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
    }

    /// Send once, turning non-2xx responses into `ApiError::Status`
    async fn send(&self, method: Method, builder: RequestBuilder) -> Result<Response, ApiError> {
        self.metrics
            .api_requests_total
            .with_label_values(&[method.as_str()])
            .inc();
        let in_flight = InFlightGuard::enter(&self.metrics.api_requests_in_flight);
        let timer = self.metrics.api_request_duration_seconds.start_timer();

        let result = builder.send().await;

        timer.observe_duration();
        drop(in_flight);

        let response = result?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let response = self
            .send(Method::GET, self.request(Method::GET, url.clone()))
            .await?;
        Self::decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.retry_min_delay)
            .with_max_times(self.read_retries);

        (|| self.get_once::<T>(&url))
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(ApiError::is_transient)
            .notify(|err: &ApiError, delay: Duration| {
                warn!(
                    url = %url,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "API read failed, retrying"
                );
            })
            .await
    }
}

/// Decode one stored rule, skipping shapes outside the operand model
fn decode_rule(document: serde_json::Value) -> Option<Rule> {
    let id = document.get("id").cloned();
    match serde_json::from_value(document) {
        Ok(rule) => Some(rule),
        Err(e) => {
            warn!(rule_id = ?id, error = %e, "Skipping rule this client cannot edit");
            None
        }
    }
}

#[async_trait]
impl RuleStore for RestApiClient {
    async fn fetch_config(&self) -> Result<Configuration, ApiError> {
        self.get_json(CONFIG_PATH).await
    }

    async fn list_rules(&self) -> Result<Vec<Rule>, ApiError> {
        let documents: Vec<serde_json::Value> = self.get_json(RULES_PATH).await?;
        Ok(documents.into_iter().filter_map(decode_rule).collect())
    }

    async fn list_rule_summaries(&self) -> Result<Vec<RuleSummary>, ApiError> {
        self.get_json(RULES_PATH).await
    }

    async fn create_rule(&self, draft: &Rule) -> Result<Rule, ApiError> {
        let url = self.endpoint(RULES_PATH)?;
        let response = self
            .send(Method::POST, self.request(Method::POST, url).json(draft))
            .await?;
        let created: Rule = Self::decode(response).await?;
        debug!(rule_id = ?created.id, name = %created.name, "Rule created");
        Ok(created)
    }

    async fn update_rule(&self, id: &RuleId, rule: &Rule) -> Result<Rule, ApiError> {
        let url = self.rule_endpoint(id)?;
        let response = self
            .send(Method::PUT, self.request(Method::PUT, url).json(rule))
            .await?;
        Self::decode(response).await
    }

    async fn delete_rule(&self, id: &RuleId) -> Result<(), ApiError> {
        let url = self.rule_endpoint(id)?;
        self.send(Method::DELETE, self.request(Method::DELETE, url))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SignalSource for RestApiClient {
    async fn fetch_signals(&self) -> Result<SignalsPayload, ApiError> {
        self.get_json(SIGNALS_PATH).await
    }
}
