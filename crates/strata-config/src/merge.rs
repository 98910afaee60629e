//! Merging one parameter's raw values across sources.
//!
//! Values arrive in priority order, highest first. Each [`ParameterType`]
//! combines them its own way:
//!
//! - **primitive**: the highest-priority non-null value wins
//! - **sequence**: items are concatenated, then `#!top` items are pulled to
//!   the front and `#!bottom` items pushed to the back
//! - **map**: keys are grouped and each key's values are merged by the
//!   element type, recursively
//! - **object**: like a map, but only declared fields are kept
//!
//! A `#!final` value stops the walk: sources of lower priority are ignored for
//! that value. This applies at every level, so a final map entry locks just
//! that entry while a final map locks the whole map.

use crate::error::ConfigError;
use crate::raw::{RawKind, RawValue, ValueShape};
use crate::types::ParameterType;
use indexmap::IndexMap;
use strata_yaml::{ParameterFlag, Yaml};

/// A sequence item tagged with its flag and the rank of its source
/// (0 = highest priority).
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceItem<T> {
    pub value: T,
    pub flag: Option<ParameterFlag>,
    pub rank: usize,
}

impl<T> SequenceItem<T> {
    pub fn new(value: T, flag: Option<ParameterFlag>, rank: usize) -> Self {
        Self { value, flag, rank }
    }
}

/// Order and de-duplicate sequence items from several sources.
///
/// Items are taken in rank order (stable within a rank). The result is:
///
/// 1. `#!top` items, lowest priority first
/// 2. every other item, highest priority first
/// 3. `#!bottom` items, highest priority first
///
/// Duplicates are removed. A value that appears both as a regular item and as
/// a top item keeps its top position; a value flagged `#!bottom` anywhere
/// ends up at the bottom.
pub fn merge_sequence<T: PartialEq + Clone>(items: &[SequenceItem<T>]) -> Vec<T> {
    let mut ordered: Vec<&SequenceItem<T>> = items.iter().collect();
    ordered.sort_by_key(|item| item.rank);

    let with_flag = |flag: ParameterFlag| {
        ordered
            .iter()
            .filter(move |item| item.flag == Some(flag))
            .map(|item| &item.value)
    };

    // Tops stack up the way the search path is read, so the
    // lowest-priority source's tops come first.
    let mut tops: Vec<&SequenceItem<T>> = ordered
        .iter()
        .copied()
        .filter(|item| item.flag == Some(ParameterFlag::Top))
        .collect();
    tops.sort_by_key(|item| std::cmp::Reverse(item.rank));

    let mut head: Vec<&T> = Vec::new();
    let all = ordered.iter().map(|item| &item.value);
    for value in tops.iter().map(|item| &item.value).chain(all) {
        if !head.contains(&value) {
            head.push(value);
        }
    }

    // Later occurrences win, so bottom items move behind everything else.
    let combined: Vec<&T> = head.into_iter().chain(with_flag(ParameterFlag::Bottom)).collect();
    let mut merged: Vec<&T> = Vec::with_capacity(combined.len());
    for value in combined.into_iter().rev() {
        if !merged.contains(&value) {
            merged.push(value);
        }
    }
    merged.reverse();
    merged.into_iter().cloned().collect()
}

/// Cut a priority-ordered list of values after the first `#!final` one.
pub fn up_to_final<'a, 'b>(values: &'b [&'a RawValue]) -> &'b [&'a RawValue] {
    match values.iter().position(|v| v.is_final()) {
        Some(index) => &values[..=index],
        None => values,
    }
}

/// Group the entries of priority-ordered maps by key.
///
/// Keys are ordered by first appearance from the lowest-priority map
/// upward. Each key's values are in priority order, cut after the first
/// `#!final` entry.
pub fn group_map_entries<'a>(
    maps: &[&'a IndexMap<String, RawValue>],
) -> IndexMap<&'a str, Vec<&'a RawValue>> {
    let mut grouped: IndexMap<&'a str, Vec<&'a RawValue>> = IndexMap::new();
    for map in maps.iter().rev() {
        for key in map.keys() {
            grouped.entry(key.as_str()).or_default();
        }
    }

    for (key, values) in grouped.iter_mut() {
        for map in maps {
            if let Some(value) = map.get(*key) {
                values.push(value);
                if value.is_final() {
                    break;
                }
            }
        }
    }
    grouped
}

/// Raw values compared by content, for sequence de-duplication.
#[derive(Debug, Clone)]
struct ByValue(RawValue);

impl PartialEq for ByValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.same_value(&other.0)
    }
}

/// Split environment text into sequence items.
pub(crate) fn split_text<'a>(text: &'a str, delimiter: &'a str) -> Vec<&'a str> {
    let parts: Vec<&str> = if delimiter.is_empty() {
        vec![text]
    } else {
        text.split(delimiter).collect()
    };
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

pub(crate) fn invalid_type(path: &str, value: &RawValue, expected: ValueShape) -> ConfigError {
    ConfigError::InvalidType {
        parameter: path.to_string(),
        source_id: value.source.to_string(),
        expected,
        found: value.shape(),
        location: value.source_info.clone(),
    }
}

impl ParameterType {
    /// Merge the values of one parameter, given in priority order.
    ///
    /// Returns `None` when there are no values at all. The merged value is
    /// normalized: sequences and maps are never null, and environment text
    /// read as a sequence is split into items.
    pub fn merge(&self, path: &str, matches: &[&RawValue]) -> Result<Option<RawValue>, ConfigError> {
        let relevant = up_to_final(matches);
        let Some(first) = relevant.first() else {
            return Ok(None);
        };

        let merged = match self {
            ParameterType::Primitive { .. } => merge_primitive(path, relevant)?,
            ParameterType::Sequence { delimiter, .. } => {
                let items = sequence_items(path, relevant, delimiter)?;
                let merged = merge_sequence(&items).into_iter().map(|v| v.0).collect();
                RawValue::sequence(merged, first.source.clone())
                    .with_source_info(first.source_info.clone())
            }
            ParameterType::Map { element, .. } => {
                let maps = map_entries(path, relevant)?;
                let mut merged = IndexMap::new();
                let mut errors = Vec::new();
                for (key, values) in group_map_entries(&maps) {
                    match element.merge(&format!("{path}.{key}"), &values) {
                        Ok(Some(value)) => {
                            merged.insert(key.to_string(), value);
                        }
                        Ok(None) => {}
                        Err(err) => errors.push(err),
                    }
                }
                ConfigError::collect(errors)?;
                RawValue::map(merged, first.source.clone()).with_source_info(first.source_info.clone())
            }
            ParameterType::Object { fields } => {
                let maps = map_entries(path, relevant)?;
                let mut grouped = group_map_entries(&maps);
                let mut merged = IndexMap::new();
                let mut errors = Vec::new();
                for (name, ty) in fields {
                    let Some(values) = grouped.shift_remove(name.as_str()) else {
                        continue;
                    };
                    match ty.merge(&format!("{path}.{name}"), &values) {
                        Ok(Some(value)) => {
                            merged.insert(name.clone(), value);
                        }
                        Ok(None) => {}
                        Err(err) => errors.push(err),
                    }
                }
                for key in grouped.keys() {
                    tracing::warn!(parameter = path, field = key, "Ignoring undeclared field");
                }
                ConfigError::collect(errors)?;
                RawValue::map(merged, first.source.clone()).with_source_info(first.source_info.clone())
            }
        };
        Ok(Some(merged))
    }
}

fn merge_primitive(path: &str, relevant: &[&RawValue]) -> Result<RawValue, ConfigError> {
    let errors: Vec<_> = relevant
        .iter()
        .filter(|v| matches!(v.shape(), ValueShape::Sequence | ValueShape::Map))
        .map(|v| invalid_type(path, v, ValueShape::Scalar))
        .collect();
    ConfigError::collect(errors)?;

    let winner = relevant
        .iter()
        .find(|v| !v.is_null())
        .unwrap_or(&relevant[0]);

    if !relevant.iter().any(|v| v.is_final()) {
        let disagrees = relevant
            .iter()
            .any(|v| !v.is_null() && !v.same_value(winner));
        if disagrees {
            tracing::debug!(
                parameter = path,
                source = %winner.source,
                "Sources disagree; using the highest-priority value"
            );
        }
    }
    Ok((*winner).clone())
}

fn sequence_items(
    path: &str,
    relevant: &[&RawValue],
    delimiter: &str,
) -> Result<Vec<SequenceItem<ByValue>>, ConfigError> {
    let mut items = Vec::new();
    let mut errors = Vec::new();
    for (rank, value) in relevant.iter().enumerate() {
        match &value.kind {
            RawKind::Sequence(seq) => {
                items.extend(
                    seq.iter()
                        .map(|item| SequenceItem::new(ByValue(item.clone()), item.flag, rank)),
                );
            }
            RawKind::Text(text) => {
                items.extend(split_text(text, delimiter).into_iter().map(|part| {
                    let item = RawValue::scalar(Yaml::String(part.to_string()), value.source.clone());
                    SequenceItem::new(ByValue(item), None, rank)
                }));
            }
            RawKind::Scalar(Yaml::Null) => {}
            _ => errors.push(invalid_type(path, value, ValueShape::Sequence)),
        }
    }
    ConfigError::collect(errors)?;
    Ok(items)
}

fn map_entries<'a>(
    path: &str,
    relevant: &[&'a RawValue],
) -> Result<Vec<&'a IndexMap<String, RawValue>>, ConfigError> {
    let mut maps = Vec::new();
    let mut errors = Vec::new();
    for value in relevant {
        match &value.kind {
            RawKind::Map(entries) => maps.push(entries),
            RawKind::Scalar(Yaml::Null) => {}
            _ => errors.push(invalid_type(path, value, ValueShape::Map)),
        }
    }
    ConfigError::collect(errors)?;
    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::SourceId;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn item(value: &'static str, flag: Option<ParameterFlag>, rank: usize) -> SequenceItem<&'static str> {
        SequenceItem::new(value, flag, rank)
    }

    fn src(id: &str) -> SourceId {
        Arc::from(id)
    }

    fn string(s: &str, source: &str) -> RawValue {
        RawValue::scalar(Yaml::String(s.into()), src(source))
    }

    fn seq(items: Vec<RawValue>, source: &str) -> RawValue {
        RawValue::sequence(items, src(source))
    }

    fn strings_of(value: &RawValue) -> Vec<String> {
        match &value.kind {
            RawKind::Sequence(items) => items
                .iter()
                .map(|i| match &i.kind {
                    RawKind::Scalar(Yaml::String(s)) => s.clone(),
                    other => panic!("expected string, got {other:?}"),
                })
                .collect(),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    // === merge_sequence ===

    #[test]
    fn test_plain_concatenation_dedupes() {
        let items = [
            item("b", None, 0),
            item("c", None, 0),
            item("a", None, 1),
            item("b", None, 1),
        ];
        assert_eq!(merge_sequence(&items), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_top_and_bottom() {
        let items = [
            item("wile", None, 0),
            item("daffy", Some(ParameterFlag::Bottom), 0),
            item("porky", Some(ParameterFlag::Top), 1),
            item("elmer", None, 1),
        ];
        assert_eq!(merge_sequence(&items), vec!["porky", "wile", "elmer", "daffy"]);
    }

    #[test]
    fn test_top_ties_list_lower_priority_first() {
        let items = [
            item("high", Some(ParameterFlag::Top), 0),
            item("high2", Some(ParameterFlag::Top), 0),
            item("low", Some(ParameterFlag::Top), 2),
            item("x", None, 1),
        ];
        assert_eq!(merge_sequence(&items), vec!["low", "high", "high2", "x"]);
    }

    #[test]
    fn test_bottom_ties_list_higher_priority_first() {
        let items = [
            item("low", Some(ParameterFlag::Bottom), 2),
            item("high", Some(ParameterFlag::Bottom), 0),
            item("x", None, 1),
        ];
        assert_eq!(merge_sequence(&items), vec!["x", "high", "low"]);
    }

    #[test]
    fn test_bottom_beats_top_for_same_value() {
        let items = [
            item("a", Some(ParameterFlag::Top), 0),
            item("b", None, 0),
            item("a", Some(ParameterFlag::Bottom), 1),
        ];
        assert_eq!(merge_sequence(&items), vec!["b", "a"]);
    }

    proptest! {
        #[test]
        fn prop_merge_sequence_is_duplicate_free(
            raw in proptest::collection::vec((0u8..6, 0u8..3, 0usize..4), 0..24)
        ) {
            let items: Vec<SequenceItem<u8>> = raw
                .iter()
                .map(|(v, f, rank)| {
                    let flag = match f {
                        1 => Some(ParameterFlag::Top),
                        2 => Some(ParameterFlag::Bottom),
                        _ => None,
                    };
                    SequenceItem::new(*v, flag, *rank)
                })
                .collect();
            let merged = merge_sequence(&items);

            for (i, v) in merged.iter().enumerate() {
                prop_assert!(!merged[i + 1..].contains(v));
            }
            for item in &items {
                prop_assert!(merged.contains(&item.value));
            }
            let bottoms: Vec<u8> = items
                .iter()
                .filter(|i| i.flag == Some(ParameterFlag::Bottom))
                .map(|i| i.value)
                .collect();
            // bottom values form the tail of the result
            let tail_start = merged.len() - merged.iter().filter(|v| bottoms.contains(v)).count();
            prop_assert!(merged[tail_start..].iter().all(|v| bottoms.contains(v)));

            // top values precede every value that is never top
            let tops: Vec<u8> = items
                .iter()
                .filter(|i| i.flag == Some(ParameterFlag::Top))
                .map(|i| i.value)
                .collect();
            let head = &merged[..tail_start];
            let first_plain = head.iter().position(|v| !tops.contains(v)).unwrap_or(head.len());
            prop_assert!(head[first_plain..].iter().all(|v| !tops.contains(v)));
        }
    }

    // === final handling ===

    #[test]
    fn test_up_to_final() {
        let a = string("a", "1");
        let b = string("b", "2").with_flag(Some(ParameterFlag::Final));
        let c = string("c", "3");
        let values = [&a, &b, &c];
        assert_eq!(up_to_final(&values).len(), 2);
        let values = [&a, &c];
        assert_eq!(up_to_final(&values).len(), 2);
    }

    #[test]
    fn test_group_map_entries_key_order_and_final() {
        let mut high = IndexMap::new();
        high.insert("https".to_string(), string("porky", "high"));
        high.insert("http".to_string(), string("foghorn", "high"));
        let mut low = IndexMap::new();
        low.insert("http".to_string(), string("taz", "low").with_flag(Some(ParameterFlag::Final)));
        low.insert("ftp".to_string(), string("elmer", "low"));
        let mut lowest = IndexMap::new();
        lowest.insert("http".to_string(), string("marv", "lowest"));

        let grouped = group_map_entries(&[&high, &low, &lowest]);
        let keys: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(keys, vec!["http", "ftp", "https"]);
        assert_eq!(grouped["http"].len(), 2);
        assert_eq!(grouped["ftp"].len(), 1);
    }

    // === type-directed merge ===

    #[test]
    fn test_primitive_highest_wins() {
        let ty = ParameterType::bool(false);
        let high = RawValue::scalar(Yaml::Boolean(true), src("high"));
        let low = RawValue::scalar(Yaml::Boolean(false), src("low"));
        let merged = ty.merge("always_yes", &[&high, &low]).unwrap().unwrap();
        assert!(matches!(merged.kind, RawKind::Scalar(Yaml::Boolean(true))));
        assert_eq!(merged.source.as_ref(), "high");
    }

    #[test]
    fn test_primitive_skips_null() {
        let ty = ParameterType::string("");
        let high = RawValue::null(src("high"));
        let low = string("value", "low");
        let merged = ty.merge("x", &[&high, &low]).unwrap().unwrap();
        assert!(merged.same_value(&low));
    }

    #[test]
    fn test_primitive_final_ignores_lower() {
        let ty = ParameterType::string("");
        let high = RawValue::null(src("high")).with_flag(Some(ParameterFlag::Final));
        let low = string("value", "low");
        let merged = ty.merge("x", &[&high, &low]).unwrap().unwrap();
        assert!(merged.is_null());
    }

    #[test]
    fn test_primitive_rejects_sequence() {
        let ty = ParameterType::bool(false);
        let bad = seq(vec![string("a", "bad")], "bad");
        let err = ty.merge("always_yes", &[&bad]).unwrap_err();
        assert!(err.is_invalid_type());
    }

    #[test]
    fn test_sequence_merge_with_final() {
        let ty = ParameterType::sequence(ParameterType::string(""));
        let high = seq(vec![string("wile", "high"), string("daffy", "high")], "high");
        let mid = seq(vec![string("porky", "mid")], "mid").with_flag(Some(ParameterFlag::Final));
        let low = seq(vec![string("elmer", "low")], "low");
        let merged = ty.merge("channels", &[&high, &mid, &low]).unwrap().unwrap();
        assert_eq!(strings_of(&merged), vec!["wile", "daffy", "porky"]);
    }

    #[test]
    fn test_sequence_from_text_and_null() {
        let ty = ParameterType::sequence(ParameterType::string(""));
        let env = RawValue::text("a, b,,c", src("envvars"));
        let empty = RawValue::null(src("file"));
        let file = seq(vec![string("b", "file2")], "file2");
        let merged = ty.merge("channels", &[&env, &empty, &file]).unwrap().unwrap();
        assert_eq!(strings_of(&merged), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sequence_rejects_map() {
        let ty = ParameterType::sequence(ParameterType::string(""));
        let bad = RawValue::map(IndexMap::new(), src("bad"));
        assert!(ty.merge("channels", &[&bad]).unwrap_err().is_invalid_type());
    }

    #[test]
    fn test_map_merge_with_entry_final() {
        let ty = ParameterType::map(ParameterType::string(""));
        let mut high = IndexMap::new();
        high.insert("http".to_string(), string("foghorn", "high"));
        let mut low = IndexMap::new();
        low.insert("http".to_string(), string("taz", "low"));
        low.insert("https".to_string(), string("marv", "low").with_flag(Some(ParameterFlag::Final)));
        let high = RawValue::map(high, src("high"));
        let low = RawValue::map(low, src("low"));

        let merged = ty.merge("proxy_servers", &[&high, &low]).unwrap().unwrap();
        let RawKind::Map(entries) = &merged.kind else {
            panic!("expected map");
        };
        assert!(entries["http"].same_value(&string("foghorn", "")));
        assert!(entries["https"].same_value(&string("marv", "")));
    }

    #[test]
    fn test_map_rejects_scalar() {
        let ty = ParameterType::map(ParameterType::string(""));
        let bad = string("not a map", "bad");
        let err = ty.merge("proxy_servers", &[&bad]).unwrap_err();
        match err {
            ConfigError::InvalidType {
                expected, found, source_id, ..
            } => {
                assert_eq!(expected, ValueShape::Map);
                assert_eq!(found, ValueShape::Scalar);
                assert_eq!(source_id, "bad");
            }
            other => panic!("expected InvalidType, got {other:?}"),
        }
    }

    #[test]
    fn test_object_keeps_declared_fields() {
        let ty = ParameterType::object([("name", ParameterType::string("")), ("port", ParameterType::int(0))]);
        let mut entries = IndexMap::new();
        entries.insert("name".to_string(), string("db", "file"));
        entries.insert("colour".to_string(), string("red", "file"));
        let value = RawValue::map(entries, src("file"));
        let merged = ty.merge("server", &[&value]).unwrap().unwrap();
        let RawKind::Map(fields) = &merged.kind else {
            panic!("expected map");
        };
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("name"));
    }

    #[test]
    fn test_no_matches() {
        let ty = ParameterType::bool(false);
        assert!(ty.merge("always_yes", &[]).unwrap().is_none());
    }
}
