//! Condition list model: default operands and shape-preserving transformations
//!
//! Every function here is pure apart from the list it is handed. Indicator
//! operands always carry a parameter set registered for their timeframe; the
//! transformations below re-derive or check `params` whenever that could break.

use crate::error::ValidationError;
use crate::models::{
    Condition, Configuration, IndicatorOperand, IndicatorSource, MacdParams, MacdValue, Operand,
    OperandKind, Operator, Timeframe,
};

use super::validation::check_offset;

/// Field-level edit applied by [`set_condition`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionPatch {
    Operand1(Operand),
    Operator(Operator),
    Operand2(Operand),
}

/// First timeframe, its first parameter set, `macd_line`, current candle
pub fn new_default_indicator_operand(config: &Configuration) -> IndicatorOperand {
    IndicatorOperand {
        source: IndicatorSource::Macd,
        timeframe: config.default_timeframe().clone(),
        params: config.default_params(),
        value: MacdValue::MacdLine,
        offset: 0,
    }
}

/// MACD line vs signal line crossover using the first operator
pub fn new_default_condition(config: &Configuration) -> Condition {
    let operand1 = new_default_indicator_operand(config);
    let operand2 = IndicatorOperand {
        value: MacdValue::SignalLine,
        ..operand1.clone()
    };
    Condition {
        operand1: Operand::Indicator(operand1),
        operator: config.default_operator(),
        operand2: Operand::Indicator(operand2),
    }
}

/// Condition appended by [`add_condition`]: default indicator against literal 0
pub fn new_appended_condition(config: &Configuration) -> Condition {
    Condition {
        operand1: Operand::Indicator(new_default_indicator_operand(config)),
        operator: config.default_operator(),
        operand2: Operand::literal(0.0),
    }
}

/// Switch an operand's variant. The previous value is discarded either way.
pub fn set_operand_type(_operand: Operand, kind: OperandKind, config: &Configuration) -> Operand {
    match kind {
        OperandKind::Indicator => Operand::Indicator(new_default_indicator_operand(config)),
        OperandKind::Literal => Operand::literal(0.0),
    }
}

/// Move an indicator operand to `timeframe`, resetting `params` to that
/// timeframe's first registered set. Literals are returned unchanged.
pub fn set_operand_timeframe(
    operand: Operand,
    timeframe: &Timeframe,
    config: &Configuration,
) -> Result<Operand, ValidationError> {
    match operand {
        Operand::Indicator(indicator) => {
            if !config.has_timeframe(timeframe) {
                return Err(ValidationError::UnknownTimeframe(timeframe.clone()));
            }
            let params = config
                .first_params(timeframe)
                .ok_or_else(|| ValidationError::UnknownTimeframe(timeframe.clone()))?;
            Ok(Operand::Indicator(IndicatorOperand {
                timeframe: timeframe.clone(),
                params,
                ..indicator
            }))
        }
        literal @ Operand::Literal { .. } => Ok(literal),
    }
}

pub fn set_operand_params(
    operand: Operand,
    params: MacdParams,
    config: &Configuration,
) -> Result<Operand, ValidationError> {
    match operand {
        Operand::Indicator(indicator) => {
            if !config.params_for(&indicator.timeframe).contains(&params) {
                return Err(ValidationError::ParamsNotAllowed {
                    timeframe: indicator.timeframe,
                    params: params.to_string(),
                });
            }
            Ok(Operand::Indicator(IndicatorOperand { params, ..indicator }))
        }
        Operand::Literal { .. } => Err(ValidationError::NotAnIndicator),
    }
}

pub fn set_operand_value(
    operand: Operand,
    value: MacdValue,
    config: &Configuration,
) -> Result<Operand, ValidationError> {
    match operand {
        Operand::Indicator(indicator) => {
            if !config.macd_values().contains(&value) {
                return Err(ValidationError::ValueNotAllowed(value.to_string()));
            }
            Ok(Operand::Indicator(IndicatorOperand { value, ..indicator }))
        }
        Operand::Literal { .. } => Err(ValidationError::NotAnIndicator),
    }
}

pub fn set_operand_offset(operand: Operand, offset: i32) -> Result<Operand, ValidationError> {
    match operand {
        Operand::Indicator(indicator) => {
            check_offset(offset)?;
            Ok(Operand::Indicator(IndicatorOperand { offset, ..indicator }))
        }
        Operand::Literal { .. } => Err(ValidationError::NotAnIndicator),
    }
}

pub fn set_literal_value(operand: Operand, value: f64) -> Result<Operand, ValidationError> {
    match operand {
        Operand::Literal { .. } if value.is_finite() => Ok(Operand::literal(value)),
        Operand::Literal { .. } => Err(ValidationError::NonFiniteLiteral),
        Operand::Indicator(_) => Err(ValidationError::NotALiteral),
    }
}

pub fn add_condition(conditions: &mut Vec<Condition>, config: &Configuration) {
    conditions.push(new_appended_condition(config));
}

/// Remove the condition at `index`. Removing the last one is allowed here;
/// an empty list is rejected when the rule is submitted.
pub fn remove_condition(
    conditions: &mut Vec<Condition>,
    index: usize,
) -> Result<Condition, ValidationError> {
    if index >= conditions.len() {
        return Err(ValidationError::NoSuchCondition {
            index,
            len: conditions.len(),
        });
    }
    Ok(conditions.remove(index))
}

pub fn set_condition(
    conditions: &mut [Condition],
    index: usize,
    patch: ConditionPatch,
) -> Result<(), ValidationError> {
    let len = conditions.len();
    let condition = conditions
        .get_mut(index)
        .ok_or(ValidationError::NoSuchCondition { index, len })?;
    match patch {
        ConditionPatch::Operand1(operand) => condition.operand1 = operand,
        ConditionPatch::Operator(operator) => condition.operator = operator,
        ConditionPatch::Operand2(operand) => condition.operand2 = operand,
    }
    Ok(())
}
