//! Param Record - scalar, overwrite-by-key run parameters

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of a logged parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value
    Int(i64),
    /// Floating point value
    Double(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    String(String),
}

impl ParamValue {
    /// Numeric view of the value (`None` for strings and booleans).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    /// String view of the value (`None` for non-strings).
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => v.fmt(f),
            Self::Double(v) => v.fmt(f),
            Self::Bool(v) => v.fmt(f),
            Self::String(v) => v.fmt(f),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// A logged parameter. Keys are unique within a run; re-logging replaces the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRecord {
    name: String,
    value: ParamValue,
    description: Option<String>,
}

impl ParamRecord {
    /// Create a new param record.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get the param key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current value.
    #[must_use]
    pub const fn value(&self) -> &ParamValue {
        &self.value
    }

    /// Get the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_conversions() {
        assert_eq!(ParamValue::from(5.75), ParamValue::Double(5.75));
        assert_eq!(ParamValue::from(500), ParamValue::Int(500));
        assert_eq!(ParamValue::from("adam"), ParamValue::String("adam".into()));
        assert_eq!(ParamValue::from(500).as_f64(), Some(500.0));
        assert_eq!(ParamValue::from("adam").as_f64(), None);
    }

    #[test]
    fn test_param_value_untagged_json() {
        let json = serde_json::to_string(&ParamValue::Double(0.5)).unwrap();
        assert_eq!(json, "0.5");
        let back: ParamValue = serde_json::from_str("\"sgd\"").unwrap();
        assert_eq!(back.as_str(), Some("sgd"));
    }

    #[test]
    fn test_param_record_description() {
        let param = ParamRecord::new("lr", 0.01).with_description("learning rate");
        assert_eq!(param.name(), "lr");
        assert_eq!(param.description(), Some("learning rate"));
    }
}
