//! Conversion from annotated YAML to raw source values.
//!
//! This module turns an [`AnnotatedYaml`] document into the top-level
//! `key -> RawValue` mapping of one source, carrying every node's flag and
//! location along.

use crate::error::ConfigError;
use crate::raw::{RawKind, RawValue, SourceId};
use indexmap::IndexMap;
use strata_yaml::{AnnotatedContent, AnnotatedYaml, Yaml};

/// Default limit on how deeply a configuration document may nest.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Convert a parsed document into the parameters of a source.
///
/// An empty document (or one holding only `null`) is an empty source. Any
/// other non-mapping root is a parse error.
pub fn raw_parameters_from_yaml(
    source: &SourceId,
    yaml: AnnotatedYaml,
    max_depth: usize,
) -> Result<IndexMap<String, RawValue>, ConfigError> {
    if yaml.is_null() {
        return Ok(IndexMap::new());
    }

    let location = yaml.source_info.clone();
    let Some((entries, _)) = yaml.into_hash() else {
        return Err(ConfigError::Parse {
            source_id: source.to_string(),
            message: "the top level of a configuration document must be a mapping".into(),
            location: Some(location),
        });
    };

    let mut parameters = IndexMap::new();
    let mut path = Vec::new();
    for entry in entries {
        let Some(key) = key_text(&entry.key.yaml) else {
            tracing::warn!(
                source = %source,
                line = entry.key.source_info.line,
                "Ignoring configuration entry with a non-scalar key"
            );
            continue;
        };
        path.push(key.clone());
        let value = raw_value_from_yaml(source, entry.value, 1, max_depth, &mut path)?;
        path.pop();
        parameters.insert(key, value);
    }
    Ok(parameters)
}

/// Convert one annotated node, recursively.
pub fn raw_value_from_yaml(
    source: &SourceId,
    yaml: AnnotatedYaml,
    depth: usize,
    max_depth: usize,
    path: &mut Vec<String>,
) -> Result<RawValue, ConfigError> {
    if depth > max_depth {
        return Err(ConfigError::NestingTooDeep {
            source_id: source.to_string(),
            max_depth,
            path: path.clone(),
        });
    }

    let flag = yaml.flag;
    let source_info = Some(yaml.source_info.clone());

    let kind = match yaml.into_content() {
        AnnotatedContent::Array(items) => {
            let mut raw_items = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                path.push(index.to_string());
                raw_items.push(raw_value_from_yaml(source, item, depth + 1, max_depth, path)?);
                path.pop();
            }
            RawKind::Sequence(raw_items)
        }
        AnnotatedContent::Hash(entries) => {
            let mut raw_entries = IndexMap::with_capacity(entries.len());
            for entry in entries {
                let Some(key) = key_text(&entry.key.yaml) else {
                    continue;
                };
                path.push(key.clone());
                let value = raw_value_from_yaml(source, entry.value, depth + 1, max_depth, path)?;
                path.pop();
                raw_entries.insert(key, value);
            }
            RawKind::Map(raw_entries)
        }
        AnnotatedContent::Scalar(yaml) => RawKind::Scalar(yaml),
    };

    Ok(RawValue {
        kind,
        flag,
        source: source.clone(),
        source_info,
    })
}

/// Scalar keys are compared as text; `1: x` and `"1": x` name the same key.
fn key_text(key: &Yaml) -> Option<String> {
    match key {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Real(r) => Some(r.clone()),
        Yaml::Boolean(b) => Some(b.to_string()),
        Yaml::Null => Some("null".to_string()),
        _ => None,
    }
}
