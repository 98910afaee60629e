//! YAML value with source location and merge-flag tracking.

use crate::{ParameterFlag, SourceInfo};
use yaml_rust2::Yaml;

/// A YAML value with source location information and its merge flag.
///
/// Wraps an owned `yaml-rust2::Yaml` value with a parallel `Children`
/// structure that carries the location and flag of every child node.
///
/// ## Example
///
/// ```rust
/// use strata_yaml::{parse, ParameterFlag};
///
/// let yaml = parse("http: foghorn  #!final").unwrap();
/// let http = yaml.get_hash_value("http").unwrap();
/// assert_eq!(http.yaml.as_str(), Some("foghorn"));
/// assert_eq!(http.flag, Some(ParameterFlag::Final));
/// assert_eq!(http.source_info.line, 1);
/// ```
#[derive(Debug, Clone)]
pub struct AnnotatedYaml {
    /// The complete yaml-rust2::Yaml value (owned).
    pub yaml: Yaml,

    /// Source location for this node.
    pub source_info: SourceInfo,

    /// Merge flag written next to this node, if any.
    pub flag: Option<ParameterFlag>,

    /// Source-tracked children (parallel structure).
    children: Children,
}

/// Source-tracked children of a YAML node.
#[derive(Debug, Clone)]
enum Children {
    /// No children (for scalars, Null, BadValue)
    None,

    /// Array elements with source tracking
    Array(Vec<AnnotatedYaml>),

    /// Hash entries with source tracking
    Hash(Vec<AnnotatedEntry>),
}

/// A key-value pair in a YAML mapping with source tracking.
///
/// The entry's flag lives on `value.flag`.
#[derive(Debug, Clone)]
pub struct AnnotatedEntry {
    /// The key with source tracking
    pub key: AnnotatedYaml,

    /// The value with source tracking
    pub value: AnnotatedYaml,
}

impl AnnotatedYaml {
    /// Create a new node for a scalar or leaf value.
    pub fn new_scalar(yaml: Yaml, source_info: SourceInfo) -> Self {
        Self {
            yaml,
            source_info,
            flag: None,
            children: Children::None,
        }
    }

    /// Create a new node for a sequence.
    pub fn new_array(yaml: Yaml, source_info: SourceInfo, children: Vec<AnnotatedYaml>) -> Self {
        Self {
            yaml,
            source_info,
            flag: None,
            children: Children::Array(children),
        }
    }

    /// Create a new node for a mapping.
    pub fn new_hash(yaml: Yaml, source_info: SourceInfo, entries: Vec<AnnotatedEntry>) -> Self {
        Self {
            yaml,
            source_info,
            flag: None,
            children: Children::Hash(entries),
        }
    }

    /// Set the merge flag.
    pub fn with_flag(mut self, flag: Option<ParameterFlag>) -> Self {
        self.flag = flag;
        self
    }

    /// Check if this is a scalar value (not array or hash).
    pub fn is_scalar(&self) -> bool {
        matches!(self.children, Children::None)
    }

    /// Check if this is an array.
    pub fn is_array(&self) -> bool {
        matches!(self.children, Children::Array(_))
    }

    /// Check if this is a hash.
    pub fn is_hash(&self) -> bool {
        matches!(self.children, Children::Hash(_))
    }

    /// Check if this is a null scalar (`~`, `null` or an empty value).
    pub fn is_null(&self) -> bool {
        self.is_scalar() && self.yaml.is_null()
    }

    /// Get array children if this is an array.
    pub fn as_array(&self) -> Option<&[AnnotatedYaml]> {
        match &self.children {
            Children::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get hash entries if this is a hash.
    pub fn as_hash(&self) -> Option<&[AnnotatedEntry]> {
        match &self.children {
            Children::Hash(entries) => Some(entries),
            _ => None,
        }
    }

    /// Get a value from a hash by key (string comparison).
    pub fn get_hash_value(&self, key: &str) -> Option<&AnnotatedYaml> {
        match &self.children {
            Children::Hash(entries) => entries
                .iter()
                .find(|entry| entry.key.yaml.as_str() == Some(key))
                .map(|entry| &entry.value),
            _ => None,
        }
    }

    /// Get an array element by index.
    pub fn get_array_item(&self, index: usize) -> Option<&AnnotatedYaml> {
        match &self.children {
            Children::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Get the number of children (array length or hash entry count).
    pub fn len(&self) -> usize {
        match &self.children {
            Children::None => 0,
            Children::Array(items) => items.len(),
            Children::Hash(entries) => entries.len(),
        }
    }

    /// Check if this node has no children.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume self and return array children if this is an array.
    pub fn into_array(self) -> Option<(Vec<AnnotatedYaml>, SourceInfo)> {
        match self.children {
            Children::Array(items) => Some((items, self.source_info)),
            _ => None,
        }
    }

    /// Consume self and return hash entries if this is a hash.
    pub fn into_hash(self) -> Option<(Vec<AnnotatedEntry>, SourceInfo)> {
        match self.children {
            Children::Hash(entries) => Some((entries, self.source_info)),
            _ => None,
        }
    }
}

/// What a node holds, with its children taken out.
#[derive(Debug, Clone)]
pub enum AnnotatedContent {
    Scalar(Yaml),
    Array(Vec<AnnotatedYaml>),
    Hash(Vec<AnnotatedEntry>),
}

impl AnnotatedYaml {
    /// Consume self and split out its scalar value or children.
    pub fn into_content(self) -> AnnotatedContent {
        match self.children {
            Children::Array(items) => AnnotatedContent::Array(items),
            Children::Hash(entries) => AnnotatedContent::Hash(entries),
            Children::None => AnnotatedContent::Scalar(self.yaml),
        }
    }
}

impl AnnotatedEntry {
    /// Create a new entry.
    pub fn new(key: AnnotatedYaml, value: AnnotatedYaml) -> Self {
        Self { key, value }
    }
}
