//! # strata-config
//!
//! Layered configuration: values for a declared set of parameters are read
//! from YAML files, directories of YAML files and environment variables, then
//! merged in priority order.
//!
//! ## Merge flags
//!
//! Merging is controlled by trailing comments in the YAML:
//!
//! - `#!final` on a value: sources of lower priority are ignored for it
//! - `#!top` on a sequence item: move it to the front of the merged sequence
//! - `#!bottom` on a sequence item: move it to the back
//!
//! ```yaml
//! always_yes: true      #!final
//! channels:
//!   - conda-forge       #!top
//!   - defaults
//! proxy_servers:
//!   http: http://proxy  #!final
//! ```
//!
//! ## Priority
//!
//! A [`SourceSet`] is ordered highest priority first. The search path is
//! listed the other way round (later entries override earlier ones), and the
//! environment source sits above every file.
//!
//! ## Example
//!
//! ```rust
//! use strata_config::{
//!     Configuration, ConfigValue, Environment, ParameterSpec, ParameterType, RawSource, Schema,
//!     SourceSet,
//! };
//!
//! let schema = Schema::from_specs([
//!     ParameterSpec::new("always_yes", ParameterType::bool(false)).with_aliases(["yes"]),
//!     ParameterSpec::new("channels", ParameterType::sequence(ParameterType::string(""))),
//! ])?;
//!
//! let mut config = Configuration::new(schema)
//!     .with_environment(Environment::from_iter([("MYAPP_CHANNELS", "local,defaults")]))
//!     .with_sources(SourceSet::from_highest_first([
//!         RawSource::from_yaml_str("user", "yes: true\nchannels: [conda-forge]\n")?,
//!     ]));
//! config.set_env_vars("myapp");
//!
//! assert_eq!(config.resolve("always_yes")?, ConfigValue::Bool(true));
//! assert_eq!(
//!     config.get::<Vec<String>>("channels")?,
//!     ["local", "defaults", "conda-forge"]
//! );
//! # Ok::<(), strata_config::ConfigError>(())
//! ```

pub mod configuration;
pub mod convert;
pub mod env;
pub mod error;
pub mod merge;
pub mod options;
pub mod raw;
pub mod resolve;
pub mod schema;
pub mod source;
pub mod types;
mod validate;
pub mod value;

pub use configuration::{Configuration, SourceReport};
pub use env::Environment;
pub use error::ConfigError;
pub use merge::{SequenceItem, group_map_entries, merge_sequence};
pub use options::{LoadOptions, ParseErrorPolicy};
pub use raw::{RawKind, RawValue, SourceId, ValueShape};
pub use schema::Schema;
pub use source::{ENV_SOURCE_ID, RawSource, SourceKind, SourceSet};
pub use types::{ParameterSpec, ParameterType};
pub use value::{ConfigValue, ElementType};

// Re-export so callers can name flags without depending on strata-yaml.
pub use strata_yaml::ParameterFlag;
