//! Untyped values as they come out of a single source.

use crate::env::Environment;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use strata_yaml::{ParameterFlag, SourceInfo, Yaml};

/// Identifier of a source: a file path, `envvars`, or a test label.
pub type SourceId = Arc<str>;

/// The structural shape of a raw value, used in type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Sequence,
    Map,
    Null,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueShape::Scalar => "a scalar",
            ValueShape::Sequence => "a sequence",
            ValueShape::Map => "a map",
            ValueShape::Null => "null",
        };
        f.write_str(s)
    }
}

/// One value from one source, before typing.
///
/// Every node remembers the source it came from and the flag written next to
/// it, so merging can honor `#!final`/`#!top`/`#!bottom` at any depth and
/// errors can name the offending source.
#[derive(Debug, Clone)]
pub struct RawValue {
    pub kind: RawKind,
    pub flag: Option<ParameterFlag>,
    pub source: SourceId,
    pub source_info: Option<SourceInfo>,
}

#[derive(Debug, Clone)]
pub enum RawKind {
    /// A YAML scalar (string, number, bool or null). Never an array or hash.
    Scalar(Yaml),
    /// Text from an environment variable; its meaning depends on the
    /// parameter type it is read as.
    Text(String),
    Sequence(Vec<RawValue>),
    Map(IndexMap<String, RawValue>),
}

impl RawValue {
    pub fn new(kind: RawKind, source: SourceId) -> Self {
        Self {
            kind,
            flag: None,
            source,
            source_info: None,
        }
    }

    pub fn scalar(yaml: Yaml, source: SourceId) -> Self {
        Self::new(RawKind::Scalar(yaml), source)
    }

    pub fn null(source: SourceId) -> Self {
        Self::scalar(Yaml::Null, source)
    }

    pub fn text(text: impl Into<String>, source: SourceId) -> Self {
        Self::new(RawKind::Text(text.into()), source)
    }

    pub fn sequence(items: Vec<RawValue>, source: SourceId) -> Self {
        Self::new(RawKind::Sequence(items), source)
    }

    pub fn map(entries: IndexMap<String, RawValue>, source: SourceId) -> Self {
        Self::new(RawKind::Map(entries), source)
    }

    pub fn with_flag(mut self, flag: Option<ParameterFlag>) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_source_info(mut self, source_info: Option<SourceInfo>) -> Self {
        self.source_info = source_info;
        self
    }

    pub fn is_final(&self) -> bool {
        self.flag == Some(ParameterFlag::Final)
    }

    pub fn is_null(&self) -> bool {
        matches!(&self.kind, RawKind::Scalar(Yaml::Null))
    }

    pub fn shape(&self) -> ValueShape {
        match &self.kind {
            RawKind::Scalar(Yaml::Null) => ValueShape::Null,
            RawKind::Scalar(_) | RawKind::Text(_) => ValueShape::Scalar,
            RawKind::Sequence(_) => ValueShape::Sequence,
            RawKind::Map(_) => ValueShape::Map,
        }
    }

    /// Structural equality of the values, ignoring flags and provenance.
    ///
    /// Environment text compares equal to a YAML string with the same content.
    pub fn same_value(&self, other: &RawValue) -> bool {
        match (&self.kind, &other.kind) {
            (RawKind::Scalar(a), RawKind::Scalar(b)) => a == b,
            (RawKind::Text(a), RawKind::Text(b)) => a == b,
            (RawKind::Text(t), RawKind::Scalar(Yaml::String(s)))
            | (RawKind::Scalar(Yaml::String(s)), RawKind::Text(t)) => t == s,
            (RawKind::Sequence(a), RawKind::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            (RawKind::Map(a), RawKind::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.same_value(w)))
            }
            _ => false,
        }
    }

    /// Expand `$VAR` references in every string leaf.
    pub fn expand_vars(&self, env: &Environment) -> RawValue {
        let kind = match &self.kind {
            RawKind::Scalar(Yaml::String(s)) => {
                RawKind::Scalar(Yaml::String(env.expand(s).into_owned()))
            }
            RawKind::Text(s) => RawKind::Text(env.expand(s).into_owned()),
            RawKind::Scalar(other) => RawKind::Scalar(other.clone()),
            RawKind::Sequence(items) => {
                RawKind::Sequence(items.iter().map(|i| i.expand_vars(env)).collect())
            }
            RawKind::Map(entries) => RawKind::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.expand_vars(env)))
                    .collect(),
            ),
        };
        RawValue {
            kind,
            flag: self.flag,
            source: self.source.clone(),
            source_info: self.source_info.clone(),
        }
    }

    /// Short human-readable rendering for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            RawKind::Scalar(yaml) => describe_scalar(yaml),
            RawKind::Text(s) => format!("'{s}'"),
            RawKind::Sequence(items) => format!(
                "[{}]",
                items.iter().map(RawValue::describe).collect::<Vec<_>>().join(", ")
            ),
            RawKind::Map(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.describe()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

fn describe_scalar(yaml: &Yaml) -> String {
    match yaml {
        Yaml::String(s) => format!("'{s}'"),
        Yaml::Integer(i) => i.to_string(),
        Yaml::Real(r) => r.clone(),
        Yaml::Boolean(b) => b.to_string(),
        Yaml::Null => "null".to_string(),
        other => format!("{other:?}"),
    }
}
