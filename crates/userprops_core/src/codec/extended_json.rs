//! Extended JSON codec.
//!
//! # Responsibility
//! - Encode property mappings as pretty-printed JSON objects.
//! - Tag scene-domain values as `{"__type__": <name>, "__value__": [...]}`.
//!
//! # Invariants
//! - Top-level buffer is always a JSON object.
//! - Object keys are written in mapping order (`serde_json/preserve_order`).
//! - `__type__` is reserved and rejected as a user nested-map key.
//! - Non-finite floats are rejected at encode time, never written as `null`.
//! - Every encoded key decodes back to the same `PropertyKey`; string keys
//!   spelled as canonical integers are rejected at encode time.

use super::{CodecError, CodecResult, PropertyCodec};
use crate::model::key::PropertyKey;
use crate::model::property_map::PropertyMap;
use crate::model::value::PropertyValue;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Value};

/// Reserved key naming the custom type of a tagged object.
pub const TYPE_TAG: &str = "__type__";
/// Reserved key holding the payload of a tagged object.
pub const VALUE_TAG: &str = "__value__";

const TYPE_VECTOR: &str = "vector";
const TYPE_MATRIX: &str = "matrix";
const TYPE_COLOR: &str = "color";

const DEFAULT_INDENT: usize = 4;

/// JSON codec with support for vector/matrix/color values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedJsonCodec {
    indent: usize,
}

impl ExtendedJsonCodec {
    pub fn new() -> Self {
        Self::with_indent(DEFAULT_INDENT)
    }

    /// Creates a codec that pretty-prints with `indent` spaces per level.
    pub fn with_indent(indent: usize) -> Self {
        Self { indent }
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Parses one standalone value, e.g. a command-line argument.
    pub fn decode_value(&self, text: &str) -> CodecResult<PropertyValue> {
        let parsed: Value =
            serde_json::from_str(text).map_err(|err| CodecError::Decode(err.to_string()))?;
        json_to_value(parsed)
    }

    /// Renders one value as compact JSON.
    pub fn encode_value(&self, value: &PropertyValue) -> CodecResult<String> {
        serde_json::to_string(&value_to_json(value)?)
            .map_err(|err| CodecError::Encode(err.to_string()))
    }
}

impl Default for ExtendedJsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyCodec for ExtendedJsonCodec {
    fn encode(&self, properties: &PropertyMap) -> CodecResult<String> {
        let mut object = Map::new();
        for (key, value) in properties.iter() {
            let json_key = key.to_json_key();
            if PropertyKey::from_json_key(&json_key) != *key {
                return Err(CodecError::Encode(format!(
                    "string key `{json_key}` would read back as an integer key"
                )));
            }
            object.insert(json_key, value_to_json(value)?);
        }

        let indent = " ".repeat(self.indent);
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        Value::Object(object)
            .serialize(&mut serializer)
            .map_err(|err| CodecError::Encode(err.to_string()))?;

        String::from_utf8(out).map_err(|err| CodecError::Encode(err.to_string()))
    }

    fn decode(&self, buffer: &str) -> CodecResult<PropertyMap> {
        let parsed: Value =
            serde_json::from_str(buffer).map_err(|err| CodecError::Decode(err.to_string()))?;

        let object = match parsed {
            Value::Object(object) => object,
            other => {
                return Err(CodecError::Decode(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )));
            }
        };

        let mut properties = PropertyMap::new();
        for (key, value) in object {
            properties.insert(PropertyKey::from_json_key(&key), json_to_value(value)?);
        }
        Ok(properties)
    }
}

fn value_to_json(value: &PropertyValue) -> CodecResult<Value> {
    let json = match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Bool(flag) => Value::Bool(*flag),
        PropertyValue::Int(number) => Value::Number(Number::from(*number)),
        PropertyValue::Float(number) => Value::Number(finite_number(*number)?),
        PropertyValue::String(text) => Value::String(text.clone()),
        PropertyValue::List(values) => Value::Array(
            values
                .iter()
                .map(value_to_json)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        PropertyValue::Map(entries) => {
            let mut object = Map::new();
            for (key, entry) in entries {
                if key == TYPE_TAG {
                    return Err(CodecError::Encode(format!(
                        "`{TYPE_TAG}` is reserved and cannot be used as a map key"
                    )));
                }
                if object.insert(key.clone(), value_to_json(entry)?).is_some() {
                    return Err(CodecError::Encode(format!("duplicate map key `{key}`")));
                }
            }
            Value::Object(object)
        }
        PropertyValue::Vector(components) => tagged(TYPE_VECTOR, components)?,
        PropertyValue::Matrix(components) => tagged(TYPE_MATRIX, components)?,
        PropertyValue::Color(components) => tagged(TYPE_COLOR, components)?,
    };
    Ok(json)
}

fn tagged(type_name: &str, components: &[f64]) -> CodecResult<Value> {
    let numbers = components
        .iter()
        .map(|component| finite_number(*component).map(Value::Number))
        .collect::<CodecResult<Vec<_>>>()?;

    let mut object = Map::new();
    object.insert(TYPE_TAG.to_string(), Value::String(type_name.to_string()));
    object.insert(VALUE_TAG.to_string(), Value::Array(numbers));
    Ok(Value::Object(object))
}

fn finite_number(value: f64) -> CodecResult<Number> {
    Number::from_f64(value)
        .ok_or_else(|| CodecError::Encode(format!("non-finite float `{value}` is not valid JSON")))
}

fn json_to_value(json: Value) -> CodecResult<PropertyValue> {
    let value = match json {
        Value::Null => PropertyValue::Null,
        Value::Bool(flag) => PropertyValue::Bool(flag),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => PropertyValue::Int(integer),
            None => PropertyValue::Float(number.as_f64().ok_or_else(|| {
                CodecError::Decode(format!("unrepresentable number `{number}`"))
            })?),
        },
        Value::String(text) => PropertyValue::String(text),
        Value::Array(values) => PropertyValue::List(
            values
                .into_iter()
                .map(json_to_value)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Value::Object(object) if object.contains_key(TYPE_TAG) => decode_tagged(object)?,
        Value::Object(object) => PropertyValue::Map(
            object
                .into_iter()
                .map(|(key, entry)| json_to_value(entry).map(|value| (key, value)))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
    };
    Ok(value)
}

fn decode_tagged(object: Map<String, Value>) -> CodecResult<PropertyValue> {
    if object.len() != 2 || !object.contains_key(VALUE_TAG) {
        return Err(CodecError::Decode(format!(
            "tagged value must contain exactly `{TYPE_TAG}` and `{VALUE_TAG}`"
        )));
    }

    let type_name = object
        .get(TYPE_TAG)
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::Decode(format!("`{TYPE_TAG}` must be a string")))?;
    let payload = object.get(VALUE_TAG).and_then(Value::as_array).ok_or_else(|| {
        CodecError::Decode(format!("`{VALUE_TAG}` of `{type_name}` must be an array"))
    })?;

    match type_name {
        TYPE_VECTOR => Ok(PropertyValue::Vector(fixed_components(type_name, payload)?)),
        TYPE_MATRIX => Ok(PropertyValue::Matrix(fixed_components(type_name, payload)?)),
        TYPE_COLOR => Ok(PropertyValue::Color(fixed_components(type_name, payload)?)),
        other => Err(CodecError::Decode(format!("unknown tagged type `{other}`"))),
    }
}

fn fixed_components<const N: usize>(type_name: &str, payload: &[Value]) -> CodecResult<[f64; N]> {
    if payload.len() != N {
        return Err(CodecError::Decode(format!(
            "`{type_name}` expects {N} components, found {}",
            payload.len()
        )));
    }

    let mut components = [0.0; N];
    for (slot, item) in components.iter_mut().zip(payload) {
        *slot = item.as_f64().ok_or_else(|| {
            CodecError::Decode(format!("`{type_name}` component `{item}` is not a number"))
        })?;
    }
    Ok(components)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::ExtendedJsonCodec;
    use crate::codec::{CodecError, PropertyCodec};
    use crate::model::key::PropertyKey;
    use crate::model::property_map::PropertyMap;
    use crate::model::value::{PropertyValue, IDENTITY_MATRIX};

    #[test]
    fn encode_pretty_prints_with_four_space_indent() {
        let codec = ExtendedJsonCodec::new();
        let properties: PropertyMap = [("scale", 2.5)].into_iter().collect();

        let text = codec.encode(&properties).expect("encode");
        assert_eq!(text, "{\n    \"scale\": 2.5\n}");
    }

    #[test]
    fn encode_keeps_insertion_order() {
        let codec = ExtendedJsonCodec::new();
        let properties: PropertyMap = [("zeta", 1), ("alpha", 2), ("mid", 3)]
            .into_iter()
            .collect();

        let text = codec.encode(&properties).expect("encode");
        let zeta = text.find("zeta").expect("zeta");
        let alpha = text.find("alpha").expect("alpha");
        let mid = text.find("mid").expect("mid");
        assert!(zeta < alpha && alpha < mid);
    }

    #[test]
    fn scene_values_survive_encode_decode() {
        let codec = ExtendedJsonCodec::new();
        let mut properties = PropertyMap::new();
        properties.insert("offset".into(), PropertyValue::Vector([1.0, -2.5, 0.0]));
        properties.insert("xform".into(), PropertyValue::Matrix(IDENTITY_MATRIX));
        properties.insert("tint".into(), PropertyValue::Color([0.2, 0.4, 0.6, 1.0]));
        properties.insert(PropertyKey::Int(3), PropertyValue::from("third"));
        properties.insert(
            "meta".into(),
            PropertyValue::Map(vec![
                ("lod".to_string(), PropertyValue::Int(1)),
                ("tags".to_string(), vec!["a", "b"].into()),
            ]),
        );

        let text = codec.encode(&properties).expect("encode");
        assert!(text.contains("\"__type__\": \"vector\""));
        assert_eq!(codec.decode(&text).expect("decode"), properties);
    }

    #[test]
    fn whole_floats_stay_floats() {
        let codec = ExtendedJsonCodec::new();
        let properties: PropertyMap = [("weight", 2.0)].into_iter().collect();

        let decoded = codec
            .decode(&codec.encode(&properties).expect("encode"))
            .expect("decode");
        assert_eq!(decoded.get(&"weight".into()), Some(&PropertyValue::Float(2.0)));
    }

    #[test]
    fn standalone_values_use_the_same_tagging() {
        let codec = ExtendedJsonCodec::new();
        let value = codec
            .decode_value(r#"{"__type__": "color", "__value__": [1, 0, 0, 1]}"#)
            .expect("decode value");
        assert_eq!(value, PropertyValue::Color([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(codec.decode_value("\"text\"").unwrap(), PropertyValue::from("text"));
        assert_eq!(codec.encode_value(&PropertyValue::Int(3)).unwrap(), "3");
    }

    #[test]
    fn decode_rejects_malformed_and_non_object_buffers() {
        let codec = ExtendedJsonCodec::new();
        for buffer in ["not json at all", "[1, 2]", "42", "{\"a\": "] {
            let err = codec.decode(buffer).expect_err("must fail");
            assert!(err.is_decode(), "`{buffer}` should be a decode error");
        }
    }

    #[test]
    fn decode_rejects_unknown_or_malformed_tags() {
        let codec = ExtendedJsonCodec::new();
        let unknown = r#"{"a": {"__type__": "quaternion", "__value__": [0, 0, 0, 1]}}"#;
        let short = r#"{"a": {"__type__": "vector", "__value__": [0, 1]}}"#;
        let extra = r#"{"a": {"__type__": "vector", "__value__": [0, 1, 2], "x": 1}}"#;

        for buffer in [unknown, short, extra] {
            assert!(matches!(codec.decode(buffer), Err(CodecError::Decode(_))));
        }
    }

    #[test]
    fn encode_rejects_non_finite_floats_and_reserved_keys() {
        let codec = ExtendedJsonCodec::new();

        let nan: PropertyMap = [("bad", f64::NAN)].into_iter().collect();
        assert!(matches!(codec.encode(&nan), Err(CodecError::Encode(_))));

        let mut reserved = PropertyMap::new();
        reserved.insert(
            "meta".into(),
            PropertyValue::Map(vec![("__type__".to_string(), PropertyValue::Null)]),
        );
        assert!(matches!(codec.encode(&reserved), Err(CodecError::Encode(_))));
    }

    #[test]
    fn encode_rejects_string_keys_spelled_as_integers() {
        let codec = ExtendedJsonCodec::new();
        let lone: PropertyMap = [(PropertyKey::from("7"), "seven")].into_iter().collect();
        assert!(matches!(codec.encode(&lone), Err(CodecError::Encode(_))));

        let mut beside_int = PropertyMap::new();
        beside_int.insert(PropertyKey::Int(1), PropertyValue::Null);
        beside_int.insert(PropertyKey::from("1"), PropertyValue::Null);
        assert!(matches!(codec.encode(&beside_int), Err(CodecError::Encode(_))));
    }

    #[test]
    fn integer_like_string_keys_that_are_not_canonical_round_trip() {
        let codec = ExtendedJsonCodec::new();
        let properties: PropertyMap = [
            (PropertyKey::from("007"), 1),
            (PropertyKey::from("+1"), 2),
            (PropertyKey::Int(7), 3),
        ]
        .into_iter()
        .collect();

        let text = codec.encode(&properties).expect("encode");
        assert_eq!(codec.decode(&text).expect("decode"), properties);
    }
}
