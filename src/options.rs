//! Engine construction options
//!
//! Options travel from configuration files or the command line to the engine
//! factory untouched; each backend decides which keys it understands.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while reading connect options
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    /// Key not understood by the backend
    #[error("Unknown connect option '{key}' (expected one of: {expected})")]
    Unknown {
        /// Offending key
        key: String,
        /// Comma separated list of accepted keys
        expected: String,
    },

    /// Value has the wrong type or is out of range
    #[error("Invalid value for connect option '{key}': expected {expected}, got {value}")]
    InvalidValue {
        /// Option key
        key: String,
        /// Human readable description of the accepted values
        expected: &'static str,
        /// The value that was supplied
        value: String,
    },

    /// A `key=value` pair without `=`
    #[error("Malformed connect option '{pair}', expected key=value")]
    Malformed {
        /// The rejected input
        pair: String,
    },
}

/// A single option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Free-form text
    Str(String),
}

impl OptionValue {
    /// Infer a typed value from command-line text
    #[must_use]
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(Self::Int)
                .ok()
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|value| value.is_finite())
                        .map(Self::Float)
                })
                .unwrap_or_else(|| Self::Str(raw.to_string())),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Options handed to the engine factory when an engine is built
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectOptions(BTreeMap<String, OptionValue>);

impl ConnectOptions {
    /// Empty option set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an option
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Parse a `key=value` pair, inferring the value type
    pub fn parse_pair(pair: &str) -> Result<(String, OptionValue), OptionError> {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| OptionError::Malformed {
                pair: pair.to_string(),
            })?;
        Ok((key.trim().to_string(), OptionValue::infer(value.trim())))
    }

    /// Raw value lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    /// Whether no options are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of options
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Reject keys outside `accepted`
    pub fn ensure_known(&self, accepted: &[&str]) -> Result<(), OptionError> {
        match self.0.keys().find(|key| !accepted.contains(&key.as_str())) {
            Some(key) => Err(OptionError::Unknown {
                key: key.clone(),
                expected: accepted.join(", "),
            }),
            None => Ok(()),
        }
    }

    /// Boolean option
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, OptionError> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Bool(value)) => Ok(Some(*value)),
            Some(other) => Err(invalid(key, "a boolean", other)),
        }
    }

    /// Non-negative integer option
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, OptionError> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Int(value)) => u64::try_from(*value)
                .map(Some)
                .map_err(|_| invalid(key, "a non-negative integer", &OptionValue::Int(*value))),
            Some(other) => Err(invalid(key, "a non-negative integer", other)),
        }
    }

    /// Numeric option, integers are widened
    #[allow(clippy::cast_precision_loss)]
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, OptionError> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Int(value)) => Ok(Some(*value as f64)),
            Some(OptionValue::Float(value)) => Ok(Some(*value)),
            Some(other) => Err(invalid(key, "a number", other)),
        }
    }

    /// Text option
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, OptionError> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Str(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(invalid(key, "a string", other)),
        }
    }
}

fn invalid(key: &str, expected: &'static str, value: &OptionValue) -> OptionError {
    OptionError::InvalidValue {
        key: key.to_string(),
        expected,
        value: value.to_string(),
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for ConnectOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}
