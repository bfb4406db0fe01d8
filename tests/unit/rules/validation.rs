//! Unit tests for rule shape validation

use nnte::error::ValidationError;
use nnte::models::{
    Condition, IndicatorOperand, IndicatorSource, MacdParams, MacdValue, Operand, Operator, Rule,
};
use nnte::rules::validation::{check_offset, validate_rule, MAX_LOOKBACK, OFFSET_CHOICES};
use nnte::rules::conditions::new_default_condition;

use crate::fixtures::basic_config;

fn rule_with(condition: Condition) -> Rule {
    Rule::draft("X", "BUY", vec![condition])
}

#[test]
fn test_default_rule_is_valid() {
    let config = basic_config();
    assert!(validate_rule(&rule_with(new_default_condition(&config)), &config).is_ok());
}

#[test]
fn test_offset_choices_cover_lookback() {
    assert_eq!(OFFSET_CHOICES.len() as i32, MAX_LOOKBACK + 1);
    for (offset, _) in OFFSET_CHOICES {
        assert!(check_offset(offset).is_ok());
    }
    assert!(check_offset(1).is_err());
    assert!(check_offset(-MAX_LOOKBACK - 1).is_err());
}

#[test]
fn test_operator_must_be_offered() {
    let config = basic_config();
    let mut condition = new_default_condition(&config);
    condition.operator = Operator::GreaterEqual;

    assert_eq!(
        validate_rule(&rule_with(condition), &config).unwrap_err(),
        ValidationError::OperatorNotAllowed(">=".to_string())
    );
}

#[test]
fn test_indicator_must_match_configuration() {
    let config = basic_config();
    let base = IndicatorOperand {
        source: IndicatorSource::Macd,
        timeframe: "1m".into(),
        params: MacdParams::new(12, 26, 9),
        value: MacdValue::MacdLine,
        offset: 0,
    };

    let unknown_tf = Condition {
        operand1: Operand::Indicator(IndicatorOperand {
            timeframe: "15m".into(),
            ..base.clone()
        }),
        operator: Operator::GreaterThan,
        operand2: Operand::literal(0.0),
    };
    assert_eq!(
        validate_rule(&rule_with(unknown_tf), &config).unwrap_err(),
        ValidationError::UnknownTimeframe("15m".into())
    );

    let bad_params = Condition {
        operand1: Operand::literal(0.0),
        operator: Operator::LessThan,
        operand2: Operand::Indicator(IndicatorOperand {
            params: MacdParams::new(5, 35, 5),
            ..base.clone()
        }),
    };
    assert!(matches!(
        validate_rule(&rule_with(bad_params), &config).unwrap_err(),
        ValidationError::ParamsNotAllowed { .. }
    ));

    let bad_offset = Condition {
        operand1: Operand::Indicator(IndicatorOperand { offset: 1, ..base }),
        operator: Operator::GreaterThan,
        operand2: Operand::literal(0.0),
    };
    assert_eq!(
        validate_rule(&rule_with(bad_offset), &config).unwrap_err(),
        ValidationError::OffsetOutOfRange(1)
    );
}

#[test]
fn test_non_finite_literal_rejected() {
    let config = basic_config();
    let mut condition = new_default_condition(&config);
    condition.operand2 = Operand::literal(f64::INFINITY);
    assert_eq!(
        validate_rule(&rule_with(condition), &config).unwrap_err(),
        ValidationError::NonFiniteLiteral
    );
}
