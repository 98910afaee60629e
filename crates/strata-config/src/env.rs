//! Process environment snapshots and `$VAR` expansion.
//!
//! Configuration never reads `std::env` while merging. Everything goes
//! through an [`Environment`] captured up front (or built by hand in tests),
//! so resolution is deterministic for a given snapshot.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    captured: bool,
}

impl Environment {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
            captured: true,
        }
    }

    /// An environment with no variables.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether this snapshot was taken from the running process.
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Re-capture the process environment if this snapshot came from it.
    /// Hand-built snapshots are returned unchanged.
    pub fn refreshed(&self) -> Self {
        if self.captured {
            Self::capture()
        } else {
            self.clone()
        }
    }

    /// Replace `$NAME` and `${NAME}` references with their values.
    ///
    /// Unset variables are left as written. A `$` not followed by a name is
    /// kept literally.
    pub fn expand<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !text.contains('$') {
            return Cow::Borrowed(text);
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
                match braced.find('}') {
                    Some(end) if is_var_name(&braced[..end]) => (&braced[..end], end + 2),
                    _ => ("", 0),
                }
            } else {
                let len = var_name_len(after);
                (&after[..len], len)
            };

            if name.is_empty() {
                out.push('$');
                rest = after;
                continue;
            }

            match self.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[pos..pos + 1 + consumed]),
            }
            rest = &after[consumed..];
        }
        out.push_str(rest);
        Cow::Owned(out)
    }

    /// Expand a leading `~` to `$HOME`, then expand variables.
    pub fn expand_path(&self, path: &str) -> PathBuf {
        let expanded = self.expand(path);
        let home = self.get("HOME");
        match (expanded.strip_prefix('~'), home) {
            (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
                PathBuf::from(format!("{home}{rest}"))
            }
            _ => PathBuf::from(expanded.as_ref()),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            captured: false,
        }
    }
}

fn var_name_len(s: &str) -> usize {
    let mut len = 0;
    for (i, c) in s.char_indices() {
        let ok = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if !ok {
            break;
        }
        len = i + c.len_utf8();
    }
    len
}

fn is_var_name(s: &str) -> bool {
    !s.is_empty() && var_name_len(s) == s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::from_iter([("EXPANDED_VAR", "itsexpanded"), ("HOME", "/home/wile")])
    }

    #[test]
    fn test_expand_both_forms() {
        let env = env();
        assert_eq!(env.expand("$EXPANDED_VAR"), "itsexpanded");
        assert_eq!(env.expand("${EXPANDED_VAR}"), "itsexpanded");
        assert_eq!(env.expand("a/${EXPANDED_VAR}/b"), "a/itsexpanded/b");
        assert_eq!(env.expand("$EXPANDED_VAR.txt"), "itsexpanded.txt");
    }

    #[test]
    fn test_unset_variables_stay_literal() {
        let env = env();
        assert_eq!(env.expand("$NOPE and ${NOPE}"), "$NOPE and ${NOPE}");
        assert_eq!(env.expand("cost: $5"), "cost: $5");
        assert_eq!(env.expand("trailing $"), "trailing $");
        assert_eq!(env.expand("${unterminated"), "${unterminated");
    }

    #[test]
    fn test_expand_without_dollar_borrows() {
        assert!(matches!(env().expand("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_expand_path_tilde() {
        let env = env();
        assert_eq!(env.expand_path("~/.strata"), PathBuf::from("/home/wile/.strata"));
        assert_eq!(env.expand_path("~"), PathBuf::from("/home/wile"));
        assert_eq!(env.expand_path("~other/x"), PathBuf::from("~other/x"));
        assert_eq!(env.expand_path("$HOME/conf"), PathBuf::from("/home/wile/conf"));
    }

    #[test]
    fn test_hand_built_snapshot_is_not_refreshed() {
        let env = env();
        assert!(!env.is_captured());
        assert_eq!(env.refreshed(), env);
    }
}
