//! External service boundaries

pub mod api_client;
pub mod rule_store;

pub use api_client::{RestApiClient, API_KEY_HEADER};
pub use rule_store::{RuleStore, SignalSource};
