//! Options controlling where configuration is loaded from.

use crate::convert::DEFAULT_MAX_DEPTH;
use crate::env::Environment;
use std::path::PathBuf;

/// What to do when a configuration file named directly in the search path
/// fails to parse.
///
/// Files found inside a search-path directory are always skipped on failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseErrorPolicy {
    /// Fail the whole load.
    #[default]
    Abort,
    /// Log a warning, record the error, and continue without that file.
    Skip,
}

/// Options for [`Configuration::load`](crate::Configuration::load).
///
/// ```rust
/// use strata_config::{Environment, LoadOptions, ParseErrorPolicy};
///
/// let options = LoadOptions::new()
///     .with_search_path(["/etc/myapp/config.yaml", "~/.myapprc"])
///     .with_app_name("MYAPP")
///     .with_environment(Environment::empty().with_var("HOME", "/home/wile"))
///     .with_parse_error_policy(ParseErrorPolicy::Skip);
/// assert_eq!(options.search_path.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Files and directories to read, lowest priority first. Entries may use
    /// `~` and `$VAR`.
    pub search_path: Vec<PathBuf>,
    /// Prefix of environment variables that override files (`MYAPP_KEY`).
    pub app_name: Option<String>,
    /// Variables used for `$VAR` expansion and the environment source.
    pub environment: Environment,
    pub parse_error_policy: ParseErrorPolicy,
    /// Maximum nesting depth of a configuration document.
    pub max_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            search_path: Vec::new(),
            app_name: None,
            environment: Environment::capture(),
            parse_error_policy: ParseErrorPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_path<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_path = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_parse_error_policy(mut self, policy: ParseErrorPolicy) -> Self {
        self.parse_error_policy = policy;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
