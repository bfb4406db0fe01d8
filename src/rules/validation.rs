//! Shape validation of rules against the operand configuration

use crate::error::ValidationError;
use crate::models::{Condition, Configuration, Operand, Rule};

/// Candles the evaluator keeps besides the current one
pub const MAX_LOOKBACK: i32 = 2;

/// Selectable indicator offsets and their labels
pub const OFFSET_CHOICES: [(i32, &str); 3] = [
    (0, "Current Candle"),
    (-1, "Previous Candle"),
    (-2, "2 Candles Ago"),
];

pub fn check_offset(offset: i32) -> Result<(), ValidationError> {
    if (-MAX_LOOKBACK..=0).contains(&offset) {
        Ok(())
    } else {
        Err(ValidationError::OffsetOutOfRange(offset))
    }
}

/// Submit-time field checks: non-empty name, signal and condition list
pub fn validate_fields(
    name: &str,
    signal: &str,
    conditions: &[Condition],
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if signal.trim().is_empty() {
        return Err(ValidationError::EmptySignal);
    }
    if conditions.is_empty() {
        return Err(ValidationError::NoConditions);
    }
    Ok(())
}

pub fn validate_operand(operand: &Operand, config: &Configuration) -> Result<(), ValidationError> {
    match operand {
        Operand::Literal { value } => {
            if value.is_finite() {
                Ok(())
            } else {
                Err(ValidationError::NonFiniteLiteral)
            }
        }
        Operand::Indicator(indicator) => {
            if !config.has_timeframe(&indicator.timeframe) {
                return Err(ValidationError::UnknownTimeframe(indicator.timeframe.clone()));
            }
            if !config.params_for(&indicator.timeframe).contains(&indicator.params) {
                return Err(ValidationError::ParamsNotAllowed {
                    timeframe: indicator.timeframe.clone(),
                    params: indicator.params.to_string(),
                });
            }
            if !config.macd_values().contains(&indicator.value) {
                return Err(ValidationError::ValueNotAllowed(indicator.value.to_string()));
            }
            check_offset(indicator.offset)
        }
    }
}

pub fn validate_condition(
    condition: &Condition,
    config: &Configuration,
) -> Result<(), ValidationError> {
    if !config.operators().contains(&condition.operator) {
        return Err(ValidationError::OperatorNotAllowed(condition.operator.to_string()));
    }
    validate_operand(&condition.operand1, config)?;
    validate_operand(&condition.operand2, config)
}

/// Full check run before a rule leaves the editor
pub fn validate_rule(rule: &Rule, config: &Configuration) -> Result<(), ValidationError> {
    validate_fields(&rule.name, &rule.signal, &rule.conditions)?;
    rule.conditions
        .iter()
        .try_for_each(|condition| validate_condition(condition, config))
}
