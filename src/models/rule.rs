//! Rule definition data models

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::{MacdParams, Timeframe};

/// Server-assigned rule identifier, echoed back in the form it was received
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleId::Number(n) => write!(f, "{}", n),
            RuleId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RuleId {
    fn from(value: i64) -> Self {
        RuleId::Number(value)
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        RuleId::Text(value.to_string())
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<=")]
    LessEqual,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Which MACD series an indicator operand reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdValue {
    MacdLine,
    SignalLine,
    Histogram,
}

impl MacdValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            MacdValue::MacdLine => "macd_line",
            MacdValue::SignalLine => "signal_line",
            MacdValue::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MacdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator family an operand is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorSource {
    #[default]
    Macd,
}

/// Reference to an indicator value at a timeframe, parameter set and candle offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorOperand {
    #[serde(default)]
    pub source: IndicatorSource,
    pub timeframe: Timeframe,
    pub params: MacdParams,
    pub value: MacdValue,
    /// 0 is the current candle, -N reads N candles back
    #[serde(default)]
    pub offset: i32,
}

/// One side of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operand {
    Indicator(IndicatorOperand),
    Literal { value: f64 },
}

impl Operand {
    pub fn literal(value: f64) -> Self {
        Operand::Literal { value }
    }

    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Indicator(_) => OperandKind::Indicator,
            Operand::Literal { .. } => OperandKind::Literal,
        }
    }

    pub fn as_indicator(&self) -> Option<&IndicatorOperand> {
        match self {
            Operand::Indicator(indicator) => Some(indicator),
            Operand::Literal { .. } => None,
        }
    }
}

impl Default for Operand {
    fn default() -> Self {
        Operand::literal(0.0)
    }
}

/// Operand variant selector used when switching an operand's type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Indicator,
    Literal,
}

/// Which operand of a condition is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// Binary comparison between two operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub operand1: Operand,
    pub operator: Operator,
    pub operand2: Operand,
}

impl Condition {
    pub fn operand(&self, side: Side) -> &Operand {
        match side {
            Side::First => &self.operand1,
            Side::Second => &self.operand2,
        }
    }

    pub fn operand_mut(&mut self, side: Side) -> &mut Operand {
        match side {
            Side::First => &mut self.operand1,
            Side::Second => &mut self.operand2,
        }
    }
}

/// Named conjunction of conditions emitting `signal` when all hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RuleId>,
    pub name: String,
    pub signal: String,
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub telegram_enabled: bool,
}

impl Rule {
    /// Unsaved rule; the server assigns the id on create
    pub fn draft(name: impl Into<String>, signal: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            id: None,
            name: name.into(),
            signal: signal.into(),
            conditions,
            telegram_enabled: false,
        }
    }

    pub fn with_id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_none()
    }
}

/// Id and name of a stored rule, readable whatever operand types it uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    #[serde(default)]
    pub id: Option<RuleId>,
    pub name: String,
}
