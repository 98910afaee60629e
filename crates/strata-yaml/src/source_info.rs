//! Where a YAML node, flag comment or parse error sits in its document.

use serde::{Deserialize, Serialize};
use yaml_rust2::scanner::Marker;

/// A span of characters in a configuration document.
///
/// Offsets and lengths count characters, not bytes, matching the markers
/// yaml-rust2 reports. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub file: Option<String>,
    pub offset: usize,
    pub line: usize,
    pub col: usize,
    pub len: usize,
}

impl SourceInfo {
    /// `len` characters starting at character `offset`, which is `line`/`col`.
    pub fn span(offset: usize, line: usize, col: usize, len: usize) -> Self {
        Self {
            file: None,
            offset,
            line,
            col,
            len,
        }
    }

    /// The first character of a document.
    pub fn document_start() -> Self {
        Self::span(0, 1, 1, 0)
    }

    /// The point a yaml-rust2 scanner marker refers to.
    pub fn from_marker(marker: &Marker) -> Self {
        // markers carry 1-based lines and 0-based columns
        Self::span(marker.index(), marker.line().max(1), marker.col() + 1, 0)
    }

    /// Name the document, if it has a name.
    pub fn with_file(mut self, file: Option<&str>) -> Self {
        if let Some(file) = file {
            self.file = Some(file.to_string());
        }
        self
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.col),
            None => write!(f, "{}:{}", self.line, self.col),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_file_keeps_existing_name_on_none() {
        let info = SourceInfo::document_start().with_file(Some("a.yml")).with_file(None);
        assert_eq!(info.file.as_deref(), Some("a.yml"));
    }

    #[test]
    fn test_display() {
        let info = SourceInfo::span(0, 3, 7, 1).with_file(Some(".apprc"));
        assert_eq!(info.to_string(), ".apprc:3:7");
        assert_eq!(SourceInfo::span(0, 3, 7, 1).to_string(), "3:7");
    }
}
