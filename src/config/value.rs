//! Dynamic configuration values

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping used for configuration contents and nested tables
pub type ConfigMap = IndexMap<String, ConfigValue>;

/// A single configuration value of any JSON/YAML-representable type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigValue>),
    Mapping(ConfigMap),
}

impl ConfigValue {
    /// Name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Integer(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "str",
            ConfigValue::Sequence(_) => "list",
            ConfigValue::Mapping(_) => "dict",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Integer(n) => Some(*n as f64),
            ConfigValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut ConfigMap> {
        match self {
            ConfigValue::Mapping(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            other => {
                let rendered = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            },
        }
    }
}

impl Default for ConfigValue {
    fn default() -> Self {
        ConfigValue::Null
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Integer(value as i64)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        ConfigValue::Integer(value as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(values: Vec<T>) -> Self {
        ConfigValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(map: ConfigMap) -> Self {
        ConfigValue::Mapping(map)
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ConfigValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_decoding() {
        let value: ConfigValue =
            serde_json::from_str(r#"{"lr": 0.01, "epochs": 10, "name": "run", "tags": [1, null, true]}"#)
                .unwrap();

        let map = value.as_mapping().unwrap();
        assert_eq!(map["lr"], ConfigValue::Float(0.01));
        assert_eq!(map["epochs"], ConfigValue::Integer(10));
        assert_eq!(map["name"], ConfigValue::from("run"));
        assert_eq!(
            map["tags"],
            ConfigValue::Sequence(vec![
                ConfigValue::Integer(1),
                ConfigValue::Null,
                ConfigValue::Bool(true)
            ])
        );
    }

    #[test]
    fn test_mapping_keeps_key_order() {
        let value: ConfigValue = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<&str> = value
            .as_mapping()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_whole_floats_stay_floats() {
        let value: ConfigValue = serde_json::from_str("1.0").unwrap();
        assert_eq!(value, ConfigValue::Float(1.0));
        assert_eq!(value.as_i64(), None);
        assert_eq!(value.as_f64(), Some(1.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(ConfigValue::from("plain").to_string(), "plain");
        assert_eq!(ConfigValue::from(vec![1, 2, 3]).to_string(), "[1,2,3]");
        assert_eq!(ConfigValue::Null.to_string(), "null");
        assert_eq!(ConfigValue::from(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_from_option() {
        assert_eq!(ConfigValue::from(None::<i64>), ConfigValue::Null);
        assert_eq!(ConfigValue::from(Some(3)), ConfigValue::Integer(3));
    }
}
