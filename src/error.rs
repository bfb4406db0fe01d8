//! Error types shared across the rule console

use crate::models::{RuleId, Timeframe};
use thiserror::Error;

/// Failure talking to the REST boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments: {0}")]
    BaseUrl(String),
}

impl ApiError {
    /// Whether an idempotent read may be retried after this error
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Decode(_) | ApiError::Url(_) | ApiError::BaseUrl(_) => false,
        }
    }
}

/// A rule, operand or configuration that does not have the required shape
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("rule name must not be empty")]
    EmptyName,
    #[error("signal label must not be empty")]
    EmptySignal,
    #[error("a rule needs at least one condition")]
    NoConditions,
    #[error("condition {index} does not exist (rule has {len})")]
    NoSuchCondition { index: usize, len: usize },
    #[error("unknown timeframe '{0}'")]
    UnknownTimeframe(Timeframe),
    #[error("parameter set {params} is not registered for timeframe '{timeframe}'")]
    ParamsNotAllowed { timeframe: Timeframe, params: String },
    #[error("operator '{0}' is not offered by the configuration")]
    OperatorNotAllowed(String),
    #[error("indicator value '{0}' is not offered by the configuration")]
    ValueNotAllowed(String),
    #[error("offset {0} is outside the supported lookback")]
    OffsetOutOfRange(i32),
    #[error("literal operands must be finite numbers")]
    NonFiniteLiteral,
    #[error("operand is not an indicator")]
    NotAnIndicator,
    #[error("operand is not a literal")]
    NotALiteral,
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Misuse of the rule editor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error("configuration has not been loaded yet")]
    NotLoaded,
    #[error("editor is not open")]
    NotOpen,
    #[error("editor is already open")]
    AlreadyOpen,
    #[error("a save is already in progress")]
    Saving,
    #[error("rule has no id and cannot be edited")]
    MissingRuleId,
    #[error("rule {0} is not in the local list")]
    UnknownRule(RuleId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failure of a rule store write or read issued by the synchronizer
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("rule {0} is not in the local list")]
    UnknownRule(RuleId),
    #[error("rule {0} is being deleted")]
    RowBusy(RuleId),
    #[error("background write was aborted")]
    Aborted,
}

/// Failure of an editor submit
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl From<ValidationError> for SubmitError {
    fn from(err: ValidationError) -> Self {
        SubmitError::Editor(EditorError::Validation(err))
    }
}

/// Missing or malformed process settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
}
