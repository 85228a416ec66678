//! Property value model.
//!
//! # Responsibility
//! - Define the closed set of values a property bag can hold.
//! - Carry scene-domain value types (vector, matrix, color) next to plain
//!   JSON shapes so the codec can tag them on the wire.
//!
//! # Invariants
//! - Nested maps keep insertion order and use text keys only.
//! - `Float` values must be finite to be encodable.

use std::fmt::{Display, Formatter};

/// Row-major 4x4 transform matrix.
pub type Matrix4 = [f64; 16];

/// 4x4 identity matrix.
pub const IDENTITY_MATRIX: Matrix4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// One user property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    /// String-keyed nested map in insertion order.
    Map(Vec<(String, PropertyValue)>),
    /// 3D vector (x, y, z).
    Vector([f64; 3]),
    Matrix(Matrix4),
    /// Linear RGBA color.
    Color([f64; 4]),
}

impl PropertyValue {
    /// Short type label used in logs and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Vector(_) => "vector",
            Self::Matrix(_) => "matrix",
            Self::Color(_) => "color",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns a float view of numeric values; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Looks up one entry of a nested map value.
    pub fn map_get(&self, key: &str) -> Option<&PropertyValue> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(entry_key, _)| entry_key == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::List(values) => {
                write!(f, "[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Vector([x, y, z]) => write!(f, "vector({x}, {y}, {z})"),
            Self::Matrix(values) => write!(f, "matrix({values:?})"),
            Self::Color([r, g, b, a]) => write!(f, "color({r}, {g}, {b}, {a})"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyValue;

    #[test]
    fn conversions_pick_expected_variants() {
        assert_eq!(PropertyValue::from(2.5), PropertyValue::Float(2.5));
        assert_eq!(PropertyValue::from(3), PropertyValue::Int(3));
        assert_eq!(PropertyValue::from(None::<i64>), PropertyValue::Null);
        assert_eq!(
            PropertyValue::from(vec!["a", "b"]),
            PropertyValue::List(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn float_view_widens_integers() {
        assert_eq!(PropertyValue::Int(4).as_float(), Some(4.0));
        assert_eq!(PropertyValue::from("4").as_float(), None);
    }

    #[test]
    fn map_get_finds_nested_entries() {
        let value = PropertyValue::Map(vec![
            ("lod".to_string(), PropertyValue::Int(2)),
            ("tag".to_string(), PropertyValue::from("hero")),
        ]);
        assert_eq!(value.map_get("tag"), Some(&PropertyValue::from("hero")));
        assert_eq!(value.map_get("missing"), None);
    }
}
