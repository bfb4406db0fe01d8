//! Interfaces of the remote rule store and signal source.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{Configuration, Rule, RuleId, RuleSummary, SignalsPayload};

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Operand configuration (timeframes, parameter sets, values, operators)
    async fn fetch_config(&self) -> Result<Configuration, ApiError>;

    /// All saved rules in server order. Rules this client cannot represent
    /// are left out rather than failing the whole list.
    async fn list_rules(&self) -> Result<Vec<Rule>, ApiError>;

    /// Id and name of every saved rule, including ones `list_rules` skips
    async fn list_rule_summaries(&self) -> Result<Vec<RuleSummary>, ApiError>;

    /// Persist a draft; the returned rule carries the assigned id
    async fn create_rule(&self, draft: &Rule) -> Result<Rule, ApiError>;

    /// Replace the stored document for `id`
    async fn update_rule(&self, id: &RuleId, rule: &Rule) -> Result<Rule, ApiError>;

    async fn delete_rule(&self, id: &RuleId) -> Result<(), ApiError>;
}

#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Latest computed signal per instrument
    async fn fetch_signals(&self) -> Result<SignalsPayload, ApiError>;
}
