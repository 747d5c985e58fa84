use std::{error::Error, fmt::Display};

use serde_json::Value;
use strum::Display as StrumDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    Null,
    Bool,
    Number,
    String,
}

/// A property value as mpv reports it. mpv properties are dynamically typed, so every consumer
/// has to say which type it expects.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeMismatch {
    pub expected: ValueType,
    pub found: ValueType,
}

impl Error for TypeMismatch {}

impl Display for TypeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Null => ValueType::Null,
            PropertyValue::Bool(_) => ValueType::Bool,
            PropertyValue::Number(_) => ValueType::Number,
            PropertyValue::String(_) => ValueType::String,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    fn mismatch(&self, expected: ValueType) -> TypeMismatch {
        TypeMismatch {
            expected,
            found: self.value_type(),
        }
    }

    /// `Ok(None)` if the property is absent
    pub fn as_bool(&self) -> Result<Option<bool>, TypeMismatch> {
        match self {
            PropertyValue::Null => Ok(None),
            PropertyValue::Bool(b) => Ok(Some(*b)),
            _ => Err(self.mismatch(ValueType::Bool)),
        }
    }

    /// `Ok(None)` if the property is absent
    pub fn as_f64(&self) -> Result<Option<f64>, TypeMismatch> {
        match self {
            PropertyValue::Null => Ok(None),
            PropertyValue::Number(n) => Ok(Some(*n)),
            _ => Err(self.mismatch(ValueType::Number)),
        }
    }

    /// `Ok(None)` if the property is absent
    pub fn as_str(&self) -> Result<Option<&str>, TypeMismatch> {
        match self {
            PropertyValue::Null => Ok(None),
            PropertyValue::String(s) => Ok(Some(s.as_str())),
            _ => Err(self.mismatch(ValueType::String)),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(PropertyValue::Null, PropertyValue::Number),
            Value::String(s) => PropertyValue::String(s),
            // Lists and maps are not used by anything here; keep them readable for logging
            other => PropertyValue::String(other.to_string()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}
