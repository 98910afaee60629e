//! Typing merged raw values.

use crate::error::ConfigError;
use crate::merge::{invalid_type, split_text};
use crate::raw::{RawKind, RawValue, ValueShape};
use crate::types::ParameterType;
use crate::value::ConfigValue;
use indexmap::IndexMap;
use strata_yaml::Yaml;

impl ParameterType {
    /// Check a raw value against this type and convert it.
    ///
    /// Null takes the default for primitives and objects, and is empty for
    /// sequences and maps. Failures inside sequences, maps and objects are
    /// collected rather than stopping at the first one.
    pub fn validate(&self, path: &str, raw: &RawValue) -> Result<ConfigValue, ConfigError> {
        match self {
            ParameterType::Primitive { element, default } => match &raw.kind {
                RawKind::Scalar(Yaml::Null) => Ok(default.clone()),
                RawKind::Scalar(yaml) => element
                    .coerce(yaml)
                    .ok_or_else(|| invalid_value(path, raw, format!("expected {element}"))),
                RawKind::Text(text) => element
                    .coerce(&Yaml::String(text.clone()))
                    .ok_or_else(|| invalid_value(path, raw, format!("expected {element}"))),
                RawKind::Sequence(_) | RawKind::Map(_) => {
                    Err(invalid_type(path, raw, ValueShape::Scalar))
                }
            },

            ParameterType::Sequence {
                element, delimiter, ..
            } => match &raw.kind {
                RawKind::Scalar(Yaml::Null) => Ok(ConfigValue::Seq(Vec::new())),
                RawKind::Sequence(items) => {
                    let results = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| element.validate(&format!("{path}[{i}]"), item));
                    collect_results(results).map(ConfigValue::Seq)
                }
                RawKind::Text(text) => {
                    let results = split_text(text, delimiter).into_iter().enumerate().map(|(i, part)| {
                        let item = RawValue::text(part, raw.source.clone())
                            .with_source_info(raw.source_info.clone());
                        element.validate(&format!("{path}[{i}]"), &item)
                    });
                    collect_results(results).map(ConfigValue::Seq)
                }
                _ => Err(invalid_type(path, raw, ValueShape::Sequence)),
            },

            ParameterType::Map { element, .. } => match &raw.kind {
                RawKind::Scalar(Yaml::Null) => Ok(ConfigValue::Map(IndexMap::new())),
                RawKind::Map(entries) => {
                    let mut map = IndexMap::with_capacity(entries.len());
                    let mut errors = Vec::new();
                    for (key, value) in entries {
                        match element.validate(&format!("{path}.{key}"), value) {
                            Ok(v) => {
                                map.insert(key.clone(), v);
                            }
                            Err(err) => errors.push(err),
                        }
                    }
                    ConfigError::collect(errors)?;
                    Ok(ConfigValue::Map(map))
                }
                _ => Err(invalid_type(path, raw, ValueShape::Map)),
            },

            ParameterType::Object { fields } => match &raw.kind {
                RawKind::Scalar(Yaml::Null) => Ok(self.default_value()),
                RawKind::Map(entries) => {
                    let mut map = IndexMap::with_capacity(fields.len());
                    let mut errors = Vec::new();
                    for (name, ty) in fields {
                        let value = match entries.get(name) {
                            Some(value) => ty.validate(&format!("{path}.{name}"), value),
                            None => Ok(ty.default_value()),
                        };
                        match value {
                            Ok(v) => {
                                map.insert(name.clone(), v);
                            }
                            Err(err) => errors.push(err),
                        }
                    }
                    ConfigError::collect(errors)?;
                    Ok(ConfigValue::Map(map))
                }
                _ => Err(invalid_type(path, raw, ValueShape::Map)),
            },
        }
    }
}

fn invalid_value(path: &str, raw: &RawValue, message: String) -> ConfigError {
    ConfigError::Validation {
        parameter: path.to_string(),
        source_id: raw.source.to_string(),
        value: raw.describe(),
        message,
        location: raw.source_info.clone(),
    }
}

fn collect_results(
    results: impl Iterator<Item = Result<ConfigValue, ConfigError>>,
) -> Result<Vec<ConfigValue>, ConfigError> {
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(v) => values.push(v),
            Err(err) => errors.push(err),
        }
    }
    ConfigError::collect(errors)?;
    Ok(values)
}
