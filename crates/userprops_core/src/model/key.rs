//! Property key model.
//!
//! # Responsibility
//! - Represent the two key shapes a property bag accepts (text or integer).
//! - Map keys to and from their JSON object-key spelling.
//!
//! # Invariants
//! - Integer keys are written as canonical decimal text (`-12`, `0`, `7`).
//! - Only canonical decimal text is read back as an integer key, so a string
//!   key with that spelling cannot be stored (see the extended JSON codec).

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Key of one user property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyKey {
    Int(i64),
    Str(String),
}

impl PropertyKey {
    /// Returns the JSON object-key spelling of this key.
    pub fn to_json_key(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Str(value) => value.clone(),
        }
    }

    /// Parses a JSON object key.
    ///
    /// Text that round-trips through `i64` unchanged becomes `Int`; anything
    /// else (`"007"`, `"+1"`, `"scale"`) stays `Str`.
    pub fn from_json_key(text: &str) -> Self {
        match text.parse::<i64>() {
            Ok(value) if value.to_string() == text => Self::Int(value),
            _ => Self::Str(text.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            Self::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Str(_) => None,
        }
    }
}

impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "`{value}`"),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for PropertyKey {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i64> for PropertyKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for PropertyKey {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}
