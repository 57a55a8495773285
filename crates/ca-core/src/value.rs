//! Attribute values exchanged with the driver.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::numeric::{Real, ensure_finite};

/// Value of one model attribute or constructor parameter.
///
/// Serialized untagged so payloads read as plain JSON/YAML scalars.
/// Variant order matters for deserialization: integers must be tried before floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(Real),
    Text(String),
}

impl AttrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_real(&self) -> Option<Real> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as Real),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Finite numeric value, or an error naming `what`.
    pub fn to_finite_real(&self, what: &str) -> CoreResult<Real> {
        let v = self.as_real().ok_or_else(|| CoreError::TypeMismatch {
            what: what.to_string(),
            expected: "number",
            found: self.type_name(),
        })?;
        ensure_finite(v, what)
    }
}

impl From<Real> for AttrValue {
    fn from(value: Real) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
