//! Parameter declarations.
//!
//! A [`ParameterType`] describes the shape of a parameter and how values from
//! several sources combine. A [`ParameterSpec`] binds a type to a name, its
//! aliases and its expansion behavior.

use crate::value::{ConfigValue, ElementType};
use indexmap::IndexMap;

/// Delimiter used to split environment text into sequence items.
pub const DEFAULT_DELIMITER: &str = ",";

/// The declared type of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    /// A single scalar. The highest-priority defined value wins.
    Primitive {
        element: ElementType,
        default: ConfigValue,
    },
    /// An ordered list merged across sources with `#!top`/`#!bottom` ordering.
    Sequence {
        element: Box<ParameterType>,
        delimiter: String,
        default: Vec<ConfigValue>,
    },
    /// A string-keyed map merged key by key.
    Map {
        element: Box<ParameterType>,
        default: IndexMap<String, ConfigValue>,
    },
    /// A record with a fixed set of fields, each merged by its own type.
    Object {
        fields: IndexMap<String, ParameterType>,
    },
}

impl ParameterType {
    pub fn primitive(element: ElementType, default: impl Into<ConfigValue>) -> Self {
        ParameterType::Primitive {
            element,
            default: default.into(),
        }
    }

    pub fn bool(default: bool) -> Self {
        Self::primitive(ElementType::Bool, default)
    }

    pub fn int(default: i64) -> Self {
        Self::primitive(ElementType::Int, default)
    }

    pub fn float(default: f64) -> Self {
        Self::primitive(ElementType::Float, default)
    }

    pub fn string(default: impl Into<String>) -> Self {
        Self::primitive(ElementType::Str, default.into())
    }

    /// A sequence with no default items, split on `,` when read from the
    /// environment.
    pub fn sequence(element: ParameterType) -> Self {
        ParameterType::Sequence {
            element: Box::new(element),
            delimiter: DEFAULT_DELIMITER.to_string(),
            default: Vec::new(),
        }
    }

    pub fn map(element: ParameterType) -> Self {
        ParameterType::Map {
            element: Box::new(element),
            default: IndexMap::new(),
        }
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, ParameterType)>,
        K: Into<String>,
    {
        ParameterType::Object {
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        }
    }

    /// Replace the environment delimiter of a sequence. No effect on other types.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        if let ParameterType::Sequence { delimiter: d, .. } = &mut self {
            *d = delimiter.into();
        }
        self
    }

    /// Replace the default of a sequence or map. No effect on other types.
    pub fn with_default(mut self, value: ConfigValue) -> Self {
        match (&mut self, value) {
            (ParameterType::Sequence { default, .. }, ConfigValue::Seq(items)) => *default = items,
            (ParameterType::Map { default, .. }, ConfigValue::Map(map)) => *default = map,
            (ParameterType::Primitive { default, .. }, value) => *default = value,
            _ => {}
        }
        self
    }

    /// The value used when no source defines the parameter.
    pub fn default_value(&self) -> ConfigValue {
        match self {
            ParameterType::Primitive { default, .. } => default.clone(),
            ParameterType::Sequence { default, .. } => ConfigValue::Seq(default.clone()),
            ParameterType::Map { default, .. } => ConfigValue::Map(default.clone()),
            ParameterType::Object { fields } => ConfigValue::Map(
                fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.default_value()))
                    .collect(),
            ),
        }
    }

    /// Short name of the type, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParameterType::Primitive { .. } => "primitive",
            ParameterType::Sequence { .. } => "sequence",
            ParameterType::Map { .. } => "map",
            ParameterType::Object { .. } => "object",
        }
    }
}

/// A named parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub ty: ParameterType,
    pub aliases: Vec<String>,
    /// Expand `$VAR` references in string leaves after merging.
    pub expand_vars: bool,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            ty,
            aliases: Vec::new(),
            expand_vars: false,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_expand_vars(mut self, expand_vars: bool) -> Self {
        self.expand_vars = expand_vars;
        self
    }

    /// The canonical name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}
