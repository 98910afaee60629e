//! Typed configuration values.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;
use strata_yaml::Yaml;

/// A fully merged and validated parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<ConfigValue>),
    Map(IndexMap<String, ConfigValue>),
}

/// Element type of a primitive parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Bool,
    Int,
    Float,
    Str,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementType::Bool => "a boolean",
            ElementType::Int => "an integer",
            ElementType::Float => "a number",
            ElementType::Str => "a string",
        };
        f.write_str(s)
    }
}

impl ElementType {
    /// Coerce a raw scalar to this element type.
    ///
    /// Returns `None` when the scalar can't represent a value of this type.
    pub fn coerce(&self, yaml: &Yaml) -> Option<ConfigValue> {
        match self {
            ElementType::Bool => match yaml {
                Yaml::Boolean(b) => Some(ConfigValue::Bool(*b)),
                Yaml::Integer(1) => Some(ConfigValue::Bool(true)),
                Yaml::Integer(0) => Some(ConfigValue::Bool(false)),
                Yaml::String(s) => parse_bool(s).map(ConfigValue::Bool),
                _ => None,
            },
            ElementType::Int => match yaml {
                Yaml::Integer(i) => Some(ConfigValue::Int(*i)),
                Yaml::String(s) => s.trim().parse().ok().map(ConfigValue::Int),
                _ => None,
            },
            ElementType::Float => match yaml {
                Yaml::Integer(i) => Some(ConfigValue::Float(*i as f64)),
                Yaml::Real(r) => parse_float(r).map(ConfigValue::Float),
                Yaml::String(s) => parse_float(s.trim()).map(ConfigValue::Float),
                _ => None,
            },
            ElementType::Str => match yaml {
                Yaml::String(s) => Some(ConfigValue::Str(s.clone())),
                Yaml::Integer(i) => Some(ConfigValue::Str(i.to_string())),
                Yaml::Real(r) => Some(ConfigValue::Str(r.clone())),
                Yaml::Boolean(b) => Some(ConfigValue::Str(b.to_string())),
                _ => None,
            },
        }
    }
}

/// Strings accepted as booleans, case-insensitively.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_float(s: &str) -> Option<f64> {
    match s {
        ".inf" | ".Inf" | ".INF" | "+.inf" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => s.parse().ok(),
    }
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key of a map value.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// The strings of a sequence of strings, or `None` for anything else.
    pub fn as_str_vec(&self) -> Option<Vec<&str>> {
        self.as_seq()?.iter().map(ConfigValue::as_str).collect()
    }

    /// Convert to a `serde_json::Value`.
    ///
    /// Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Build a sequence of strings.
    pub fn strings<I, S>(items: I) -> ConfigValue
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConfigValue::Seq(items.into_iter().map(|s| ConfigValue::Str(s.into())).collect())
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Bool(b) => serializer.serialize_bool(*b),
            ConfigValue::Int(i) => serializer.serialize_i64(*i),
            ConfigValue::Float(f) => serializer.serialize_f64(*f),
            ConfigValue::Str(s) => serializer.serialize_str(s),
            ConfigValue::Seq(items) => serializer.collect_seq(items),
            ConfigValue::Map(map) => serializer.collect_map(map),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Int(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::Str(s) => f.write_str(s),
            ConfigValue::Seq(_) | ConfigValue::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Int(value.into())
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(value: Vec<T>) -> Self {
        ConfigValue::Seq(value.into_iter().map(Into::into).collect())
    }
}
