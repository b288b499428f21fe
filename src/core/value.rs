//! Purpose: JSON-like configuration values as received from the host.
//! Exports: `ConfigValue`, `ConfigKeyMap`, `GlobalConfiguration`.
//! Role: Loosely-typed input to coercion and resolution; also the override payload format.
//! Invariants: Maps are ordered by key so iteration never depends on insertion order.
//! Invariants: Host JSON integers decode to `Int` when they fit i64, else `UInt`, else `Float`.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

pub type ConfigKeyMap = BTreeMap<String, ConfigValue>;
pub type GlobalConfiguration = ConfigKeyMap;

#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    /// Unconverted JSON number, kept as the host spelled it.
    Number(Number),
    Text(String),
    /// Raw bytes holding text or nested JSON.
    Bytes(Vec<u8>),
    Array(Vec<ConfigValue>),
    Object(ConfigKeyMap),
}

impl ConfigValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Name used in type-mismatch diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::UInt(_) | ConfigValue::Int(_) => "integer",
            ConfigValue::Float(_) | ConfigValue::Number(_) => "number",
            ConfigValue::Text(_) => "string",
            ConfigValue::Bytes(_) => "bytes",
            ConfigValue::Array(_) => "array",
            ConfigValue::Object(_) => "object",
        }
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(value) => ConfigValue::Bool(value),
            Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    ConfigValue::Int(value)
                } else if let Some(value) = number.as_u64() {
                    ConfigValue::UInt(value)
                } else if let Some(value) = number.as_f64() {
                    ConfigValue::Float(value)
                } else {
                    ConfigValue::Number(number)
                }
            }
            Value::String(text) => ConfigValue::Text(text),
            Value::Array(items) => {
                ConfigValue::Array(items.into_iter().map(ConfigValue::from_json).collect())
            }
            Value::Object(object) => ConfigValue::Object(
                object
                    .into_iter()
                    .map(|(key, value)| (key, ConfigValue::from_json(value)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::Null => Value::Null,
            ConfigValue::Bool(value) => Value::Bool(*value),
            ConfigValue::UInt(value) => Value::from(*value),
            ConfigValue::Int(value) => Value::from(*value),
            ConfigValue::Float(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ConfigValue::Number(number) => Value::Number(number.clone()),
            ConfigValue::Text(text) => Value::String(text.clone()),
            ConfigValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            ConfigValue::Array(items) => Value::Array(items.iter().map(ConfigValue::to_json).collect()),
            ConfigValue::Object(object) => Value::Object(map_to_json(object)),
        }
    }
}

pub fn map_to_json(map: &ConfigKeyMap) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ConfigValue::from_json)
    }
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ConfigValue {
            fn from(value: $ty) -> Self {
                ConfigValue::UInt(value as u64)
            }
        })*
    };
}

macro_rules! from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ConfigValue {
            fn from(value: $ty) -> Self {
                ConfigValue::Int(value as i64)
            }
        })*
    };
}

from_unsigned!(u8, u16, u32, u64, usize);
from_signed!(i8, i16, i32, i64, isize);

impl From<f32> for ConfigValue {
    fn from(value: f32) -> Self {
        ConfigValue::Float(f64::from(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<Vec<u8>> for ConfigValue {
    fn from(value: Vec<u8>) -> Self {
        ConfigValue::Bytes(value)
    }
}

impl From<&[u8]> for ConfigValue {
    fn from(value: &[u8]) -> Self {
        ConfigValue::Bytes(value.to_vec())
    }
}

impl From<Number> for ConfigValue {
    fn from(value: Number) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        ConfigValue::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigKeyMap, ConfigValue};
    use serde_json::json;

    #[test]
    fn json_numbers_pick_narrowest_variant() {
        assert_eq!(ConfigValue::from_json(json!(-3)), ConfigValue::Int(-3));
        assert_eq!(ConfigValue::from_json(json!(120)), ConfigValue::Int(120));
        assert_eq!(
            ConfigValue::from_json(json!(18446744073709551615u64)),
            ConfigValue::UInt(u64::MAX)
        );
        assert_eq!(ConfigValue::from_json(json!(1.5)), ConfigValue::Float(1.5));
    }

    #[test]
    fn nested_objects_decode_to_ordered_maps() {
        let value: ConfigValue =
            serde_json::from_str(r#"{"b": [true, null], "a": "x"}"#).expect("decode");
        let ConfigValue::Object(map) = value else {
            panic!("expected object");
        };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(
            map.get("b"),
            Some(&ConfigValue::Array(vec![ConfigValue::Bool(true), ConfigValue::Null]))
        );
    }

    #[test]
    fn bytes_serialize_as_text() {
        let mut map = ConfigKeyMap::new();
        map.insert("useTabs".to_string(), ConfigValue::from(b"true".as_slice()));
        map.insert("indentWidth".to_string(), ConfigValue::from(4u32));
        let text = serde_json::to_string(&map).expect("encode");
        assert_eq!(text, r#"{"indentWidth":4,"useTabs":"true"}"#);
    }

    #[test]
    fn type_names_are_stable() {
        assert_eq!(ConfigValue::from("x").type_name(), "string");
        assert_eq!(ConfigValue::from(1.0f32).type_name(), "number");
        assert_eq!(ConfigValue::from(-1i8).type_name(), "integer");
        assert_eq!(ConfigValue::Object(ConfigKeyMap::new()).type_name(), "object");
    }
}
