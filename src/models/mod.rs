//! Shared data models for rules, configuration and signals.

pub mod config;
pub mod rule;
pub mod signal;

pub use config::{Configuration, MacdParams, Timeframe};
pub use rule::{
    Condition, IndicatorOperand, IndicatorSource, MacdValue, Operand, OperandKind, Operator, Rule,
    RuleId, RuleSummary, Side,
};
pub use signal::{SignalEntry, SignalState, SignalTone, SignalsPayload, NO_SIGNAL};
