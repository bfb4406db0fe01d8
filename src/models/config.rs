//! Server-provided operand configuration
//!
//! The configuration enumerates every legal operand shape: timeframes, the MACD
//! parameter sets registered per timeframe, indicator values and operators.
//! It is fetched once and never mutated, so defaults are resolved up front and
//! every accessor is infallible.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::rule::{MacdValue, Operator};
use crate::error::ValidationError;

/// Candle timeframe label ("1m", "5m", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeframe(String);

impl Timeframe {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Timeframe {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// MACD periods (fast, slow, signal), encoded as `[12, 26, 9]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacdParams(pub u32, pub u32, pub u32);

impl MacdParams {
    pub fn new(fast: u32, slow: u32, signal: u32) -> Self {
        Self(fast, slow, signal)
    }

    pub fn fast(&self) -> u32 {
        self.0
    }

    pub fn slow(&self) -> u32 {
        self.1
    }

    pub fn signal(&self) -> u32 {
        self.2
    }
}

impl fmt::Display for MacdParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0, self.1, self.2)
    }
}

/// Wire form of `GET /api/config`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigurationDocument {
    timeframes: Vec<Timeframe>,
    operators: Vec<Operator>,
    macd_values: Vec<MacdValue>,
    macd_params_by_timeframe: HashMap<Timeframe, Vec<MacdParams>>,
}

/// Operand configuration, guaranteed to offer at least one timeframe, one
/// operator and one parameter set per timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigurationDocument", into = "ConfigurationDocument")]
pub struct Configuration {
    timeframes: Vec<Timeframe>,
    operators: Vec<Operator>,
    macd_values: Vec<MacdValue>,
    params_by_timeframe: HashMap<Timeframe, Vec<MacdParams>>,
    default_timeframe: Timeframe,
    default_params: MacdParams,
    default_operator: Operator,
}

impl Configuration {
    pub fn new(
        timeframes: Vec<Timeframe>,
        operators: Vec<Operator>,
        macd_values: Vec<MacdValue>,
        params_by_timeframe: HashMap<Timeframe, Vec<MacdParams>>,
    ) -> Result<Self, ValidationError> {
        let default_timeframe = timeframes
            .first()
            .cloned()
            .ok_or_else(|| ValidationError::Configuration("no timeframes offered".to_string()))?;
        let default_operator = *operators
            .first()
            .ok_or_else(|| ValidationError::Configuration("no operators offered".to_string()))?;

        for timeframe in &timeframes {
            let has_params = params_by_timeframe
                .get(timeframe)
                .is_some_and(|sets| !sets.is_empty());
            if !has_params {
                return Err(ValidationError::Configuration(format!(
                    "timeframe '{}' has no parameter sets",
                    timeframe
                )));
            }
        }

        let default_params = params_by_timeframe
            .get(&default_timeframe)
            .and_then(|sets| sets.first())
            .copied()
            .ok_or_else(|| {
                ValidationError::Configuration(format!(
                    "timeframe '{}' has no parameter sets",
                    default_timeframe
                ))
            })?;

        Ok(Self {
            timeframes,
            operators,
            macd_values,
            params_by_timeframe,
            default_timeframe,
            default_params,
            default_operator,
        })
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn macd_values(&self) -> &[MacdValue] {
        &self.macd_values
    }

    /// Parameter sets registered for `timeframe`, empty when it is unknown
    pub fn params_for(&self, timeframe: &Timeframe) -> &[MacdParams] {
        self.params_by_timeframe
            .get(timeframe)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First parameter set of `timeframe`, `None` when the timeframe is unknown
    pub fn first_params(&self, timeframe: &Timeframe) -> Option<MacdParams> {
        self.params_for(timeframe).first().copied()
    }

    pub fn has_timeframe(&self, timeframe: &Timeframe) -> bool {
        self.timeframes.contains(timeframe)
    }

    pub fn default_timeframe(&self) -> &Timeframe {
        &self.default_timeframe
    }

    pub fn default_params(&self) -> MacdParams {
        self.default_params
    }

    pub fn default_operator(&self) -> Operator {
        self.default_operator
    }
}

impl TryFrom<ConfigurationDocument> for Configuration {
    type Error = ValidationError;

    fn try_from(doc: ConfigurationDocument) -> Result<Self, Self::Error> {
        Configuration::new(
            doc.timeframes,
            doc.operators,
            doc.macd_values,
            doc.macd_params_by_timeframe,
        )
    }
}

impl From<Configuration> for ConfigurationDocument {
    fn from(config: Configuration) -> Self {
        Self {
            timeframes: config.timeframes,
            operators: config.operators,
            macd_values: config.macd_values,
            macd_params_by_timeframe: config.params_by_timeframe,
        }
    }
}
