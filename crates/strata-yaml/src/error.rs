//! Error types for YAML parsing with source locations.

use crate::SourceInfo;
use thiserror::Error;

/// Result type alias for strata-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during YAML parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// YAML syntax error
    #[error("Parse error: {message}{}", format_location(location))]
    ParseError {
        message: String,
        location: Option<SourceInfo>,
    },
}

fn format_location(location: &Option<SourceInfo>) -> String {
    location
        .as_ref()
        .map(|l| format!(" at {l}"))
        .unwrap_or_default()
}

impl Error {
    /// The human-readable part of the error, without the "Parse error" prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::ParseError { message, .. } => message,
        }
    }

    /// Attach a filename to the error location.
    pub(crate) fn with_file(self, file: Option<&str>) -> Self {
        match (self, file) {
            (Error::ParseError { message, location }, Some(file)) => Error::ParseError {
                message,
                location: Some(
                    location
                        .unwrap_or_else(SourceInfo::document_start)
                        .with_file(Some(file)),
                ),
            },
            (error, None) => error,
        }
    }
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        Error::ParseError {
            message: err.info().to_string(),
            location: Some(SourceInfo::from_marker(err.marker())),
        }
    }
}
