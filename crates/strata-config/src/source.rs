//! Configuration sources and the ordered set they form.

use crate::convert::{DEFAULT_MAX_DEPTH, raw_parameters_from_yaml};
use crate::env::Environment;
use crate::error::ConfigError;
use crate::options::{LoadOptions, ParseErrorPolicy};
use crate::raw::{RawValue, SourceId};
use indexmap::IndexMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_yaml::FlagDiagnostic;

/// Identifier of the environment-variable source.
pub const ENV_SOURCE_ID: &str = "envvars";

/// Where a source's values came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    File(PathBuf),
    Environment { app_name: String },
    /// Built in code, e.g. from a string.
    Memory,
}

/// The top-level parameters of one source.
#[derive(Debug, Clone)]
pub struct RawSource {
    id: SourceId,
    kind: SourceKind,
    parameters: IndexMap<String, RawValue>,
    diagnostics: Vec<FlagDiagnostic>,
}

impl RawSource {
    pub fn new(id: impl Into<SourceId>, kind: SourceKind, parameters: IndexMap<String, RawValue>) -> Self {
        Self {
            id: id.into(),
            kind,
            parameters,
            diagnostics: Vec::new(),
        }
    }

    /// Parse a YAML document held in memory.
    ///
    /// ```rust
    /// use strata_config::RawSource;
    ///
    /// let source = RawSource::from_yaml_str("file1", "always_yes: true  #!final").unwrap();
    /// assert!(source.get("always_yes").unwrap().is_final());
    /// ```
    pub fn from_yaml_str(id: impl Into<SourceId>, content: &str) -> Result<Self, ConfigError> {
        Self::parse(id.into(), SourceKind::Memory, content, None, DEFAULT_MAX_DEPTH)
    }

    /// Read and parse a file. Returns `Ok(None)` if the file doesn't exist.
    pub fn from_file(path: &Path, max_depth: usize) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                });
            }
        };
        let id = path.display().to_string();
        let source = Self::parse(
            Arc::from(id.as_str()),
            SourceKind::File(path.to_path_buf()),
            &content,
            Some(&id),
            max_depth,
        )?;
        tracing::debug!(
            path = %path.display(),
            parameters = source.len(),
            "Loaded configuration file"
        );
        Ok(Some(source))
    }

    fn parse(
        id: SourceId,
        kind: SourceKind,
        content: &str,
        filename: Option<&str>,
        max_depth: usize,
    ) -> Result<Self, ConfigError> {
        let mut diagnostics = Vec::new();
        let yaml = strata_yaml::parse_with_diagnostics(content, filename, &mut diagnostics)
            .map_err(|err| ConfigError::from_yaml(&id, err))?;
        for diagnostic in &diagnostics {
            tracing::warn!(source = %id, "{diagnostic}");
        }
        let parameters = raw_parameters_from_yaml(&id, yaml, max_depth)?;
        Ok(Self {
            id,
            kind,
            parameters,
            diagnostics,
        })
    }

    /// Collect `{APP}_{KEY}` variables as text values keyed by lowercased `KEY`.
    ///
    /// ```rust
    /// use strata_config::{Environment, RawSource};
    ///
    /// let env = Environment::from_iter([("MYAPP_CHANNELS", "a,b"), ("OTHER", "x")]);
    /// let source = RawSource::from_environment("myapp", &env);
    /// assert_eq!(source.keys().collect::<Vec<_>>(), vec!["channels"]);
    /// ```
    pub fn from_environment(app_name: &str, env: &Environment) -> Self {
        let prefix = format!("{}_", app_name.to_uppercase());
        let id: SourceId = Arc::from(ENV_SOURCE_ID);
        let parameters = env
            .iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(&prefix)?;
                (!key.is_empty()).then(|| (key.to_lowercase(), RawValue::text(value, id.clone())))
            })
            .collect();
        Self {
            id,
            kind: SourceKind::Environment {
                app_name: app_name.to_string(),
            },
            parameters,
            diagnostics: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.parameters.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn parameters(&self) -> &IndexMap<String, RawValue> {
        &self.parameters
    }

    /// Unknown `#!` annotations found while parsing.
    pub fn diagnostics(&self) -> &[FlagDiagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Sources in priority order, highest first.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sources: Vec<RawSource>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from sources listed highest priority first.
    pub fn from_highest_first(sources: impl IntoIterator<Item = RawSource>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
        }
    }

    /// Build from sources listed lowest priority first (search-path order).
    pub fn from_lowest_first(sources: impl IntoIterator<Item = RawSource>) -> Self {
        let mut sources: Vec<_> = sources.into_iter().collect();
        sources.reverse();
        Self { sources }
    }

    /// Add a source above all others, replacing any source with the same id.
    pub fn push_highest(&mut self, source: RawSource) {
        self.sources.retain(|s| s.id != source.id);
        self.sources.insert(0, source);
    }

    /// Add a source below all others, replacing any source with the same id.
    pub fn push_lowest(&mut self, source: RawSource) {
        self.sources.retain(|s| s.id != source.id);
        self.sources.push(source);
    }

    /// Sources in priority order, highest first.
    pub fn iter(&self) -> std::slice::Iter<'_, RawSource> {
        self.sources.iter()
    }

    pub fn as_slice(&self) -> &[RawSource] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&RawSource> {
        self.sources.iter().find(|s| s.id() == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(RawSource::id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a RawSource;
    type IntoIter = std::slice::Iter<'a, RawSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}

/// Sources read from the search path, plus the errors of skipped files.
#[derive(Debug, Default)]
pub struct LoadedSources {
    pub sources: SourceSet,
    pub skipped: Vec<ConfigError>,
}

/// Read every file and directory on the search path.
///
/// Entries are lowest priority first. A directory contributes its visible
/// files in name order, later names overriding earlier ones. Missing entries
/// are skipped; so are directory members that fail to parse. A file named
/// directly fails the load unless the policy is [`ParseErrorPolicy::Skip`].
pub fn load_search_path(options: &LoadOptions) -> Result<LoadedSources, ConfigError> {
    let mut loaded = Vec::new();
    let mut skipped = Vec::new();

    for entry in &options.search_path {
        let path = options
            .environment
            .expand_path(&entry.to_string_lossy());

        if path.is_dir() {
            for file in directory_files(&path)? {
                match RawSource::from_file(&file, options.max_depth) {
                    Ok(Some(source)) => loaded.push(source),
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(path = %file.display(), error = %err, "Skipping configuration file");
                        skipped.push(err);
                    }
                }
            }
            continue;
        }

        match RawSource::from_file(&path, options.max_depth) {
            Ok(Some(source)) => loaded.push(source),
            Ok(None) => {
                tracing::debug!(path = %path.display(), "Configuration file not found");
            }
            Err(err) if options.parse_error_policy == ParseErrorPolicy::Skip => {
                tracing::warn!(path = %path.display(), error = %err, "Skipping configuration file");
                skipped.push(err);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(LoadedSources {
        sources: SourceSet::from_lowest_first(loaded),
        skipped,
    })
}

/// Visible regular files directly inside `dir`, sorted by name.
fn directory_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let io_error = |err: std::io::Error| ConfigError::Io {
        path: dir.to_path_buf(),
        message: err.to_string(),
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn options(paths: Vec<PathBuf>) -> LoadOptions {
        LoadOptions::new()
            .with_search_path(paths)
            .with_environment(Environment::empty())
    }

    #[test]
    fn test_from_environment() {
        let env = Environment::from_iter([
            ("STRATA_ALWAYS_YES", "yes"),
            ("STRATA_CHANNELS", "wile, daffy"),
            ("STRATA_", "ignored"),
            ("OTHER_VAR", "x"),
        ]);
        let source = RawSource::from_environment("strata", &env);
        assert_eq!(source.id(), ENV_SOURCE_ID);
        let mut keys: Vec<_> = source.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["always_yes", "channels"]);
        assert!(source
            .get("channels")
            .unwrap()
            .same_value(&RawValue::text("wile, daffy", Arc::from("x"))));
    }

    #[test]
    fn test_source_set_priority() {
        let low = RawSource::from_yaml_str("low", "a: 1").unwrap();
        let high = RawSource::from_yaml_str("high", "a: 2").unwrap();
        let mut set = SourceSet::from_lowest_first([low, high]);
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["high", "low"]);

        let top = RawSource::from_yaml_str("top", "a: 3").unwrap();
        set.push_highest(top);
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["top", "high", "low"]);

        let replaced = RawSource::from_yaml_str("low", "a: 4").unwrap();
        set.push_highest(replaced);
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["low", "top", "high"]);
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = RawSource::from_file(&dir.path().join("nope.yml"), DEFAULT_MAX_DEPTH);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_search_path_directory_order() {
        let dir = tempfile::tempdir().unwrap();
        let conf_d = dir.path().join("conf.d");
        fs::create_dir(&conf_d).unwrap();
        fs::write(conf_d.join("b.yml"), "always_yes: false\n").unwrap();
        fs::write(conf_d.join("a.yml"), "always_yes: true\n").unwrap();
        fs::write(conf_d.join(".hidden.yml"), "always_yes: maybe\n").unwrap();
        let rc = dir.path().join("rc.yml");
        fs::write(&rc, "channels: [x]\n").unwrap();

        let loaded = load_search_path(&options(vec![conf_d.clone(), rc.clone()])).unwrap();
        let ids: Vec<_> = loaded.sources.ids().map(str::to_string).collect();
        assert_eq!(
            ids,
            vec![
                rc.display().to_string(),
                conf_d.join("b.yml").display().to_string(),
                conf_d.join("a.yml").display().to_string(),
            ]
        );
        assert!(loaded.skipped.is_empty());
    }

    #[test]
    fn test_search_path_missing_entries_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_search_path(&options(vec![dir.path().join("missing.yml")])).unwrap();
        assert!(loaded.sources.is_empty());
    }

    #[test]
    fn test_parse_error_policy() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.yml");
        fs::write(&bad, "key: [unclosed\n").unwrap();

        let err = load_search_path(&options(vec![bad.clone()])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let opts = options(vec![bad]).with_parse_error_policy(ParseErrorPolicy::Skip);
        let loaded = load_search_path(&opts).unwrap();
        assert!(loaded.sources.is_empty());
        assert_eq!(loaded.skipped.len(), 1);
    }

    #[test]
    fn test_bad_directory_member_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.yml"), "key: [unclosed\n").unwrap();
        fs::write(dir.path().join("good.yml"), "always_yes: true\n").unwrap();

        let loaded = load_search_path(&options(vec![dir.path().to_path_buf()])).unwrap();
        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);
    }

    #[test]
    fn test_search_path_expands_variables() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rc.yml"), "always_yes: true\n").unwrap();
        let env = Environment::from_iter([("CONF_ROOT", dir.path().display().to_string())]);
        let opts = LoadOptions::new()
            .with_search_path(["$CONF_ROOT/rc.yml"])
            .with_environment(env);
        let loaded = load_search_path(&opts).unwrap();
        assert_eq!(loaded.sources.len(), 1);
    }

    #[test]
    fn test_unknown_annotation_recorded() {
        let source = RawSource::from_yaml_str("file", "always_yes: true  #!finale\n").unwrap();
        assert_eq!(source.diagnostics().len(), 1);
        assert_eq!(source.diagnostics()[0].hint.as_deref(), Some("final"));
        assert!(!source.get("always_yes").unwrap().is_final());
    }
}
