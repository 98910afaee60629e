//! Resolving one parameter across a set of sources.

use crate::env::Environment;
use crate::error::ConfigError;
use crate::raw::RawValue;
use crate::source::RawSource;
use crate::types::ParameterSpec;
use crate::value::ConfigValue;

/// Collect the values of a parameter from `sources`, in priority order.
///
/// Fails if more than one of the parameter's names (canonical or alias) is
/// used anywhere in `sources`, even with equal values.
pub fn collect_matches<'a>(
    spec: &ParameterSpec,
    sources: &'a [RawSource],
) -> Result<Vec<&'a RawValue>, ConfigError> {
    let mut matches = Vec::new();
    let mut keys: Vec<&str> = Vec::new();
    let mut found_in: Vec<&str> = Vec::new();

    for source in sources {
        for name in spec.names() {
            if let Some(value) = source.get(name) {
                matches.push(value);
                if !keys.contains(&name) {
                    keys.push(name);
                }
                if !found_in.contains(&source.id()) {
                    found_in.push(source.id());
                }
            }
        }
    }

    if keys.len() > 1 {
        return Err(ConfigError::MultipleAliases {
            parameter: spec.name.clone(),
            keys: keys.into_iter().map(str::to_string).collect(),
            sources: found_in.into_iter().map(str::to_string).collect(),
        });
    }
    Ok(matches)
}

/// Merge a parameter's values, expanding variables if the parameter asks
/// for it. `None` means no source defines the parameter.
pub fn merge_parameter(
    spec: &ParameterSpec,
    sources: &[RawSource],
    env: &Environment,
) -> Result<Option<RawValue>, ConfigError> {
    let matches = collect_matches(spec, sources)?;
    let Some(merged) = spec.ty.merge(&spec.name, &matches)? else {
        return Ok(None);
    };
    if spec.expand_vars {
        Ok(Some(merged.expand_vars(env)))
    } else {
        Ok(Some(merged))
    }
}

/// Merge and validate a parameter. Undefined parameters take their default.
pub fn resolve_parameter(
    spec: &ParameterSpec,
    sources: &[RawSource],
    env: &Environment,
) -> Result<ConfigValue, ConfigError> {
    match merge_parameter(spec, sources, env)? {
        Some(raw) => spec.ty.validate(&spec.name, &raw),
        None => Ok(spec.ty.default_value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParameterType;

    fn always_yes() -> ParameterSpec {
        ParameterSpec::new("always_yes", ParameterType::bool(false))
            .with_aliases(["always_yes_altname1", "yes", "always_yes_altname2"])
    }

    fn source(id: &str, content: &str) -> RawSource {
        RawSource::from_yaml_str(id, content).unwrap()
    }

    #[test]
    fn test_alias_resolves() {
        let sources = [source("file1", "always_yes_altname1: true\n")];
        let value = resolve_parameter(&always_yes(), &sources, &Environment::empty()).unwrap();
        assert_eq!(value, ConfigValue::Bool(true));
    }

    #[test]
    fn test_aliases_across_sources_conflict() {
        let sources = [
            source("file1", "always_yes: true\n"),
            source("file2", "yes: true\n"),
        ];
        let err = collect_matches(&always_yes(), &sources).unwrap_err();
        match err {
            ConfigError::MultipleAliases { keys, sources, .. } => {
                assert_eq!(keys, vec!["always_yes", "yes"]);
                assert_eq!(sources, vec!["file1", "file2"]);
            }
            other => panic!("expected MultipleAliases, got {other:?}"),
        }
    }

    #[test]
    fn test_same_name_in_many_sources_is_fine() {
        let sources = [
            source("file1", "yes: true\n"),
            source("file2", "yes: false\n"),
        ];
        assert_eq!(collect_matches(&always_yes(), &sources).unwrap().len(), 2);
    }

    #[test]
    fn test_undefined_takes_default() {
        let spec = ParameterSpec::new("channels", ParameterType::sequence(ParameterType::string("")))
            .with_aliases(["channels_altname"]);
        let sources = [source("file1", "other: 1\n")];
        let value = resolve_parameter(&spec, &sources, &Environment::empty()).unwrap();
        assert_eq!(value, ConfigValue::Seq(vec![]));
    }

    #[test]
    fn test_expansion_runs_after_merge() {
        let spec = ParameterSpec::new("path", ParameterType::string("")).with_expand_vars(true);
        let env = Environment::from_iter([("ROOT", "/opt")]);
        let sources = [source("file1", "path: $ROOT/bin\n")];
        let value = resolve_parameter(&spec, &sources, &env).unwrap();
        assert_eq!(value, ConfigValue::from("/opt/bin"));

        let plain = ParameterSpec::new("path", ParameterType::string(""));
        let value = resolve_parameter(&plain, &sources, &env).unwrap();
        assert_eq!(value, ConfigValue::from("$ROOT/bin"));
    }
}
