//! # strata-yaml
//!
//! YAML parsing with source location tracking and merge-flag annotations.
//!
//! This crate provides [`AnnotatedYaml`], which wraps `yaml-rust2::Yaml` with
//! source location information for every node in the YAML tree, plus the
//! merge flag (`#!final`, `#!top`, `#!bottom`) written as a trailing comment
//! next to that node.
//!
//! ## Flag attachment
//!
//! YAML parsers drop comments, so flags are recovered from the source text
//! line by line and attached while the tree is built:
//!
//! - a map value takes the flag written on its key's line
//!   (`http: foghorn  #!final`, or `channels:  #!final` above a block value)
//! - a block sequence item takes the flag written on its `-` line
//! - flow sequences (`[a, b]`) never carry item flags
//!
//! ## Example
//!
//! ```rust
//! use strata_yaml::{parse, ParameterFlag};
//!
//! let yaml = parse("channels:\n  - wile  #!top\n  - daffy\n").unwrap();
//! let channels = yaml.get_hash_value("channels").unwrap();
//! let first = channels.get_array_item(0).unwrap();
//! assert_eq!(first.flag, Some(ParameterFlag::Top));
//! ```

mod annotated;
mod error;
mod flag;
mod parser;
mod source_info;

pub use annotated::{AnnotatedContent, AnnotatedEntry, AnnotatedYaml};
pub use error::{Error, Result};
pub use flag::{FlagDiagnostic, ParameterFlag, UnknownFlag};
pub use parser::{parse, parse_file, parse_with_diagnostics};
pub use source_info::SourceInfo;

// Re-export so downstream crates match on the same scalar type.
pub use yaml_rust2::Yaml;
