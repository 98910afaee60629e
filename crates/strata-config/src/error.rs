//! Error taxonomy for loading, merging and validating configuration.

use crate::raw::ValueShape;
use std::path::PathBuf;
use strata_yaml::SourceInfo;
use thiserror::Error;

/// Errors that can occur during configuration operations.
///
/// `InvalidType`, `Validation`, `MultipleAliases` and `Aggregate` form the
/// validation family; see [`ConfigError::is_validation`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A configuration document is not well-formed.
    #[error("Could not parse {source_id}: {message}")]
    Parse {
        source_id: String,
        message: String,
        location: Option<SourceInfo>,
    },

    /// An existing configuration file could not be read.
    #[error("Could not read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The raw value's shape does not match the declared parameter type.
    #[error("Parameter '{parameter}' from {source_id} must be {expected}, found {found}")]
    InvalidType {
        parameter: String,
        source_id: String,
        expected: ValueShape,
        found: ValueShape,
        location: Option<SourceInfo>,
    },

    /// The value has the right shape but its content is not acceptable.
    #[error("Parameter '{parameter}' has invalid value {value} from {source_id}: {message}")]
    Validation {
        parameter: String,
        source_id: String,
        value: String,
        message: String,
        location: Option<SourceInfo>,
    },

    /// More than one name of the same parameter is set across the sources.
    #[error(
        "Parameter '{parameter}' is set under multiple names ({}) in {}",
        keys.join(", "),
        sources.join(", ")
    )]
    MultipleAliases {
        parameter: String,
        keys: Vec<String>,
        sources: Vec<String>,
    },

    /// Several validation failures reported together.
    #[error("{}", format_aggregate(errors))]
    Aggregate { errors: Vec<ConfigError> },

    /// The key is neither a parameter nor an alias in the schema.
    #[error("Unknown configuration parameter '{0}'")]
    UnknownParameter(String),

    /// No source with this identifier is loaded.
    #[error("Unknown configuration source '{0}'")]
    UnknownSource(String),

    /// A schema registers the same name or alias twice.
    #[error("Parameter name '{name}' is already registered by '{existing}'")]
    DuplicateParameter { name: String, existing: String },

    /// Configuration nesting exceeds maximum depth.
    #[error("Config nesting too deep (max depth: {max_depth}) in {source_id} at path: {}", path.join("."))]
    NestingTooDeep {
        source_id: String,
        max_depth: usize,
        path: Vec<String>,
    },

    /// A resolved value could not be converted to the requested Rust type.
    #[error("Parameter '{parameter}' could not be converted: {message}")]
    Deserialize { parameter: String, message: String },
}

fn format_aggregate(errors: &[ConfigError]) -> String {
    let mut out = format!(
        "{} configuration error{}:",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for error in errors {
        out.push_str("\n  - ");
        out.push_str(&error.to_string());
    }
    out
}

impl ConfigError {
    /// Wrap errors in an aggregate, flattening nested aggregates.
    pub fn aggregate(errors: impl IntoIterator<Item = ConfigError>) -> ConfigError {
        let mut flat = Vec::new();
        for error in errors {
            match error {
                ConfigError::Aggregate { errors } => flat.extend(errors),
                other => flat.push(other),
            }
        }
        ConfigError::Aggregate { errors: flat }
    }

    /// No errors is success, one error is returned as itself, several are
    /// aggregated.
    pub fn collect(errors: Vec<ConfigError>) -> Result<(), ConfigError> {
        let mut errors = errors;
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::aggregate(errors)),
        }
    }

    /// The individual errors inside this one (itself, unless aggregated).
    pub fn leaves(&self) -> Vec<&ConfigError> {
        match self {
            ConfigError::Aggregate { errors } => errors.iter().flat_map(|e| e.leaves()).collect(),
            other => vec![other],
        }
    }

    /// True for shape mismatches, including any inside an aggregate.
    pub fn is_invalid_type(&self) -> bool {
        self.leaves()
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. }))
    }

    /// True for the validation family (type, value, alias and aggregate errors).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConfigError::InvalidType { .. }
                | ConfigError::Validation { .. }
                | ConfigError::MultipleAliases { .. }
                | ConfigError::Aggregate { .. }
        )
    }

    /// True for the aggregate form produced by whole-configuration validation.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, ConfigError::Aggregate { .. })
    }

    /// Convert a YAML parse failure for the given source.
    pub(crate) fn from_yaml(source_id: &str, err: strata_yaml::Error) -> ConfigError {
        match err {
            strata_yaml::Error::ParseError { message, location } => ConfigError::Parse {
                source_id: source_id.to_string(),
                message,
                location,
            },
        }
    }
}

impl From<strata_yaml::Error> for ConfigError {
    fn from(err: strata_yaml::Error) -> Self {
        let source_id = match &err {
            strata_yaml::Error::ParseError { location, .. } => location
                .as_ref()
                .and_then(|l| l.file.clone())
                .unwrap_or_else(|| "<string>".to_string()),
        };
        ConfigError::from_yaml(&source_id, err)
    }
}
