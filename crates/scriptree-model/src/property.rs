//! Typed per-node properties
//!
//! A property stores its value as text plus a [`PropertyType`] tag. Scalars
//! are kept as their string form; dicts and lists are serialized JSON and
//! round-trip verbatim.

use crate::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type tag of a stored property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyType {
    /// Scalar stored as text
    Str,
    /// Serialized JSON object
    Dict,
    /// Serialized JSON array
    List,
}

impl PropertyType {
    /// Infer the tag from the runtime shape of a value
    #[must_use]
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Dict,
            Value::Array(_) => Self::List,
            _ => Self::Str,
        }
    }
}

/// Stored property record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub kind: PropertyType,
    /// Encoded value; `None` for an explicit null
    pub raw: Option<String>,
    pub enabled: bool,
}

impl Property {
    /// Encode a value into an enabled property
    ///
    /// # Errors
    /// Returns [`ModelError::Encode`] if a dict or list cannot be serialized.
    pub fn encode(name: impl Into<String>, value: &Value) -> Result<Self, ModelError> {
        let kind = PropertyType::infer(value);
        let raw = match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
            Value::Object(_) | Value::Array(_) => {
                Some(serde_json::to_string(value).map_err(ModelError::Encode)?)
            }
        };
        Ok(Self {
            name: name.into(),
            kind,
            raw,
            enabled: true,
        })
    }

    /// Decode the stored payload back into a value
    ///
    /// # Errors
    /// Returns [`ModelError::Decode`] if a dict or list payload is not valid JSON.
    pub fn decode(&self) -> Result<Value, ModelError> {
        let Some(raw) = &self.raw else {
            return Ok(Value::Null);
        };
        match self.kind {
            PropertyType::Str => Ok(Value::String(raw.clone())),
            PropertyType::Dict | PropertyType::List => {
                serde_json::from_str(raw).map_err(|source| ModelError::Decode {
                    name: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// Whether replacing this record with `other` changes the stored value
    #[must_use]
    pub fn differs_from(&self, other: &Property) -> bool {
        self.kind != other.kind || self.raw != other.raw
    }

    /// Text form used in change-log entries
    #[inline]
    #[must_use]
    pub fn audit_text(&self) -> Option<String> {
        self.raw.clone()
    }
}
