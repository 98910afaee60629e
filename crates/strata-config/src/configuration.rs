//! The configuration facade: named parameters resolved lazily from sources.

use crate::env::Environment;
use crate::error::ConfigError;
use crate::options::LoadOptions;
use crate::resolve::{merge_parameter, resolve_parameter};
use crate::schema::Schema;
use crate::source::{ENV_SOURCE_ID, RawSource, SourceSet, load_search_path};
use crate::types::ParameterSpec;
use crate::value::ConfigValue;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::HashMap;

/// Typed values and errors from checking one source on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceReport {
    pub source_id: String,
    /// Values of the parameters this source defines, by canonical name.
    pub values: IndexMap<String, ConfigValue>,
    pub errors: Vec<ConfigError>,
}

/// A schema bound to a set of sources.
///
/// Parameters are resolved on first access and cached by canonical name.
/// Anything that changes the sources clears the cache. The cache uses a
/// `RefCell`, so a `Configuration` is not `Sync`.
///
/// ```rust
/// use strata_config::{Configuration, ParameterSpec, ParameterType, RawSource, Schema, SourceSet};
///
/// let schema = Schema::new()
///     .with(ParameterSpec::new("always_yes", ParameterType::bool(false)))?
///     .with(ParameterSpec::new("channels", ParameterType::sequence(ParameterType::string(""))))?;
///
/// let sources = SourceSet::from_highest_first([
///     RawSource::from_yaml_str("user", "channels:\n  - conda-forge  #!top\n")?,
///     RawSource::from_yaml_str("system", "always_yes: true\nchannels: [defaults]\n")?,
/// ]);
///
/// let config = Configuration::new(schema).with_sources(sources);
/// assert!(config.get::<bool>("always_yes")?);
/// assert_eq!(config.get::<Vec<String>>("channels")?, ["conda-forge", "defaults"]);
/// # Ok::<(), strata_config::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct Configuration {
    schema: Schema,
    options: LoadOptions,
    sources: SourceSet,
    load_errors: Vec<ConfigError>,
    cache: RefCell<HashMap<String, ConfigValue>>,
}

impl Configuration {
    /// A configuration with no sources. Every parameter has its default until
    /// sources are added.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            options: LoadOptions::default(),
            sources: SourceSet::new(),
            load_errors: Vec::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Read the search path and, if an app name is set, the environment.
    pub fn load(schema: Schema, options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self {
            options,
            ..Self::new(schema)
        };
        config.initialize()?;
        Ok(config)
    }

    /// Re-read every source, picking up changed files and (for a captured
    /// environment) changed variables.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        self.options.environment = self.options.environment.refreshed();
        self.initialize()
    }

    fn initialize(&mut self) -> Result<(), ConfigError> {
        let loaded = load_search_path(&self.options)?;
        self.sources = loaded.sources;
        self.load_errors = loaded.skipped;
        if let Some(app_name) = self.options.app_name.clone() {
            self.set_env_vars(&app_name);
        }
        self.clear_cache();
        Ok(())
    }

    /// Replace all sources.
    pub fn set_raw_sources(&mut self, sources: SourceSet) {
        self.sources = sources;
        self.clear_cache();
    }

    /// Builder form of [`Configuration::set_raw_sources`].
    pub fn with_sources(mut self, sources: SourceSet) -> Self {
        self.set_raw_sources(sources);
        self
    }

    /// Add the `{APP}_{KEY}` environment variables as the highest-priority
    /// source, replacing a previous environment source.
    pub fn set_env_vars(&mut self, app_name: &str) {
        let source = RawSource::from_environment(app_name, &self.options.environment);
        tracing::debug!(app_name, parameters = source.len(), "Loaded environment variables");
        self.options.app_name = Some(app_name.to_string());
        self.sources.push_highest(source);
        self.clear_cache();
    }

    /// Replace the environment used for expansion and the environment source.
    pub fn set_environment(&mut self, environment: Environment) {
        self.options.environment = environment;
        if let Some(app_name) = self.options.app_name.clone() {
            if self.sources.get(ENV_SOURCE_ID).is_some() {
                self.set_env_vars(&app_name);
            }
        }
        self.clear_cache();
    }

    /// Builder form of [`Configuration::set_environment`].
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.set_environment(environment);
        self
    }

    fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    fn spec(&self, key: &str) -> Result<&ParameterSpec, ConfigError> {
        self.schema
            .get(key)
            .ok_or_else(|| ConfigError::UnknownParameter(key.to_string()))
    }

    /// The merged, validated value of a parameter (by name or alias).
    pub fn resolve(&self, key: &str) -> Result<ConfigValue, ConfigError> {
        let spec = self.spec(key)?;
        if let Some(value) = self.cache.borrow().get(&spec.name) {
            tracing::trace!(parameter = %spec.name, "Configuration cache hit");
            return Ok(value.clone());
        }

        let value = resolve_parameter(spec, self.sources.as_slice(), &self.options.environment)?;
        tracing::debug!(parameter = %spec.name, kind = spec.ty.kind_name(), "Resolved parameter");
        self.cache
            .borrow_mut()
            .insert(spec.name.clone(), value.clone());
        Ok(value)
    }

    /// Resolve a parameter and convert it to a Rust type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let value = self.resolve(key)?;
        serde_json::from_value(value.to_json()).map_err(|err| ConfigError::Deserialize {
            parameter: key.to_string(),
            message: err.to_string(),
        })
    }

    /// Resolve a parameter without reading or filling the cache.
    pub fn check_source(&self, key: &str) -> Result<ConfigValue, ConfigError> {
        let spec = self.spec(key)?;
        resolve_parameter(spec, self.sources.as_slice(), &self.options.environment)
    }

    /// Validate every parameter defined by one source, ignoring all others.
    ///
    /// Errors are returned in the report, not raised. Keys the schema doesn't
    /// know are skipped.
    pub fn inspect_source(&self, source_id: &str) -> Result<SourceReport, ConfigError> {
        let source = self
            .sources
            .get(source_id)
            .ok_or_else(|| ConfigError::UnknownSource(source_id.to_string()))?;
        let single = std::slice::from_ref(source);

        let mut report = SourceReport {
            source_id: source_id.to_string(),
            ..Default::default()
        };
        for key in source.keys() {
            if self.schema.get(key).is_none() {
                tracing::debug!(source = source_id, key, "Ignoring unknown parameter");
            }
        }

        for spec in self.schema.parameters() {
            let result = merge_parameter(spec, single, &self.options.environment).and_then(|raw| {
                raw.map(|raw| spec.ty.validate(&spec.name, &raw)).transpose()
            });
            match result {
                Ok(Some(value)) => {
                    report.values.insert(spec.name.clone(), value);
                }
                Ok(None) => {}
                Err(err) => report.errors.push(err),
            }
        }
        Ok(report)
    }

    /// Typed values of every source checked on its own, keyed by source id.
    pub fn collect_all(&self) -> Result<IndexMap<String, IndexMap<String, ConfigValue>>, ConfigError> {
        let mut all = IndexMap::new();
        let mut errors = Vec::new();
        for id in self.sources.ids() {
            let report = self.inspect_source(id)?;
            errors.extend(report.errors);
            all.insert(report.source_id, report.values);
        }
        if errors.is_empty() {
            Ok(all)
        } else {
            Err(ConfigError::aggregate(errors))
        }
    }

    /// Resolve every parameter, reporting all failures in one aggregate error.
    pub fn validate_configuration(&self) -> Result<(), ConfigError> {
        let errors: Vec<_> = self
            .schema
            .names()
            .filter_map(|name| self.resolve(name).err())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::aggregate(errors))
        }
    }

    /// Check each source on its own, then the merged configuration.
    ///
    /// A single failure is returned as itself, several as an aggregate.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        for id in self.sources.ids() {
            errors.extend(self.inspect_source(id)?.errors);
        }
        ConfigError::collect(errors)?;

        match self.validate_configuration() {
            Err(ConfigError::Aggregate { errors }) => ConfigError::collect(errors),
            other => other,
        }
    }

    /// Whether a parameter (by name or alias) has a cached value.
    pub fn is_cached(&self, key: &str) -> bool {
        self.schema
            .canonical_name(key)
            .is_some_and(|name| self.cache.borrow().contains_key(name))
    }

    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Files that were skipped because they failed to parse.
    pub fn load_errors(&self) -> &[ConfigError] {
        &self.load_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParameterType;

    fn schema() -> Schema {
        Schema::from_specs([
            ParameterSpec::new("always_yes", ParameterType::bool(false))
                .with_aliases(["always_yes_altname1", "yes"]),
            ParameterSpec::new("channels", ParameterType::sequence(ParameterType::string(""))),
        ])
        .unwrap()
    }

    fn config(sources: &[(&str, &str)]) -> Configuration {
        let sources = sources
            .iter()
            .map(|(id, content)| RawSource::from_yaml_str(*id, content).unwrap());
        Configuration::new(schema())
            .with_environment(Environment::empty())
            .with_sources(SourceSet::from_highest_first(sources))
    }

    #[test]
    fn test_resolve_caches_by_canonical_name() {
        let config = config(&[("file1", "yes: true\n")]);
        assert!(!config.is_cached("always_yes"));
        assert_eq!(config.resolve("yes").unwrap(), ConfigValue::Bool(true));
        assert!(config.is_cached("always_yes"));
        assert!(config.is_cached("always_yes_altname1"));
        assert_eq!(config.cache_len(), 1);
    }

    #[test]
    fn test_unknown_parameter() {
        let config = config(&[]);
        assert_eq!(
            config.resolve("nope"),
            Err(ConfigError::UnknownParameter("nope".into()))
        );
    }

    #[test]
    fn test_errors_are_not_cached() {
        let config = config(&[("file1", "always_yes: maybe\n")]);
        assert!(config.resolve("always_yes").is_err());
        assert!(!config.is_cached("always_yes"));
    }

    #[test]
    fn test_set_raw_sources_clears_cache() {
        let mut config = config(&[("file1", "always_yes: true\n")]);
        assert_eq!(config.resolve("always_yes").unwrap(), ConfigValue::Bool(true));
        config.set_raw_sources(SourceSet::from_highest_first([
            RawSource::from_yaml_str("file2", "always_yes: false\n").unwrap(),
        ]));
        assert_eq!(config.cache_len(), 0);
        assert_eq!(config.resolve("always_yes").unwrap(), ConfigValue::Bool(false));
    }

    #[test]
    fn test_get_deserialize_error() {
        let config = config(&[("file1", "channels: [a]\n")]);
        let err = config.get::<bool>("channels").unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize { .. }));
    }

    #[test]
    fn test_inspect_source() {
        let config = config(&[
            ("good", "always_yes: yes\nunknown_key: 1\n"),
            ("bad", "always_yes: yeah\nchannels: [x]\n"),
        ]);
        let report = config.inspect_source("good").unwrap();
        assert_eq!(report.values.len(), 1);
        assert_eq!(report.values["always_yes"], ConfigValue::Bool(true));
        assert!(report.errors.is_empty());

        let report = config.inspect_source("bad").unwrap();
        assert_eq!(report.values.len(), 1);
        assert_eq!(report.errors.len(), 1);

        assert_eq!(
            config.inspect_source("missing"),
            Err(ConfigError::UnknownSource("missing".into()))
        );
    }

    #[test]
    fn test_set_env_vars_is_highest_priority() {
        let env = Environment::from_iter([("STRATA_ALWAYS_YES", "no")]);
        let mut config = config(&[("file1", "always_yes: true\n")]).with_environment(env);
        config.set_env_vars("strata");
        assert_eq!(config.sources().ids().next(), Some(ENV_SOURCE_ID));
        assert_eq!(config.resolve("always_yes").unwrap(), ConfigValue::Bool(false));

        config.set_environment(Environment::from_iter([("STRATA_ALWAYS_YES", "yes")]));
        assert_eq!(config.resolve("always_yes").unwrap(), ConfigValue::Bool(true));
        assert_eq!(config.sources().len(), 2);
    }
}
