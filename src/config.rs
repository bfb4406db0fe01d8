//! Process settings read from the environment

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 15;
pub const DEFAULT_READ_RETRIES: usize = 2;
pub const DEFAULT_RETRY_MIN_DELAY_MS: u64 = 250;

/// Deployment environment, selects the log format
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

/// Connection and polling settings for the REST boundary
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub api_key: String,
    pub poll_interval: Duration,
    pub read_retries: usize,
    pub retry_min_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            api_key: api_key.into(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECONDS),
            read_retries: DEFAULT_READ_RETRIES,
            retry_min_delay: Duration::from_millis(DEFAULT_RETRY_MIN_DELAY_MS),
        })
    }

    /// Build from `API_URL`, `API_KEY` and the optional tuning variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("API_URL").map_err(|_| ConfigError::Missing("API_URL"))?;
        let api_key = env::var("API_KEY").map_err(|_| ConfigError::Missing("API_KEY"))?;

        let poll_seconds = parse_var("POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECONDS)?;
        if poll_seconds == 0 {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL_SECONDS",
                reason: "must be greater than zero".to_string(),
            });
        }
        let read_retries = parse_var("API_READ_RETRIES", DEFAULT_READ_RETRIES)?;
        let retry_min_delay_ms = parse_var("API_RETRY_MIN_DELAY_MS", DEFAULT_RETRY_MIN_DELAY_MS)?;

        Ok(Self::new(&base_url, api_key)?
            .with_poll_interval(Duration::from_secs(poll_seconds))
            .with_read_retries(read_retries)
            .with_retry_min_delay(Duration::from_millis(retry_min_delay_ms)))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_read_retries(mut self, retries: usize) -> Self {
        self.read_retries = retries;
        self
    }

    pub fn with_retry_min_delay(mut self, delay: Duration) -> Self {
        self.retry_min_delay = delay;
        self
    }
}

/// Parse a base URL so relative endpoint paths join beneath it
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
