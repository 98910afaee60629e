//! Merge-flag annotations written as YAML comments.
//!
//! A flag is a trailing comment of the exact form `#!final`, `#!top` or
//! `#!bottom`. Anything else after `#` is an ordinary comment, except that a
//! `#!word` annotation with an unknown word is reported as a diagnostic so
//! typos such as `#!finale` don't silently lose their meaning.

use crate::SourceInfo;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A merge flag attached to a single value node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterFlag {
    /// Lock the value: sources of lower priority may not change it.
    Final,
    /// Pin a sequence item to the front of the merged sequence.
    Top,
    /// Pin a sequence item to the back of the merged sequence.
    Bottom,
}

/// Error returned when parsing a flag name that isn't `final`, `top` or `bottom`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parameter flag '{0}'")]
pub struct UnknownFlag(pub String);

impl ParameterFlag {
    /// Look a flag up by its bare name (`"final"`, `"top"`, `"bottom"`).
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    /// The bare name of the flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterFlag::Final => "final",
            ParameterFlag::Top => "top",
            ParameterFlag::Bottom => "bottom",
        }
    }
}

impl FromStr for ParameterFlag {
    type Err = UnknownFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "final" => Ok(ParameterFlag::Final),
            "top" => Ok(ParameterFlag::Top),
            "bottom" => Ok(ParameterFlag::Bottom),
            other => Err(UnknownFlag(other.to_string())),
        }
    }
}

impl fmt::Display for ParameterFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#!{}", self.as_str())
    }
}

/// A `#!word` annotation that is not a known flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDiagnostic {
    /// The annotation as written, without the leading `#!`
    pub annotation: String,
    /// Suggested replacement, if the annotation looks like a typo
    pub hint: Option<String>,
    /// Where the annotation was found
    pub location: SourceInfo,
}

impl fmt::Display for FlagDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown annotation '#!{}' at {}", self.annotation, self.location)?;
        match &self.hint {
            Some(hint) => write!(f, " (did you mean '#!{}'?)", hint),
            None => write!(f, " (valid flags are: final, top, bottom)"),
        }
    }
}

/// What the comment scanner learned about one source line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LineAnnotation {
    /// The flag written in this line's trailing comment, if any
    pub flag: Option<ParameterFlag>,
    /// True when the line holds nothing but a `-` sequence indicator
    pub bare_dash: bool,
}

/// Scan every line of `content` for flag comments.
///
/// The returned vector is indexed by `line - 1`.
pub(crate) fn scan_lines(
    content: &str,
    file: Option<&str>,
    diagnostics: &mut Vec<FlagDiagnostic>,
) -> Vec<LineAnnotation> {
    let mut offset = 0;
    let mut lines = Vec::new();

    for (index, line) in content.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut annotation = LineAnnotation::default();

        let (body, comment) = match comment_start(line) {
            Some(pos) => (&line[..pos], Some((pos, &line[pos + 1..]))),
            None => (line, None),
        };
        annotation.bare_dash = body.trim() == "-";

        if let Some((pos, comment)) = comment {
            let name = comment
                .strip_prefix('!')
                .and_then(|rest| rest.split(char::is_whitespace).next())
                .filter(|name| !name.is_empty());
            if let Some(name) = name {
                match name.parse::<ParameterFlag>() {
                    Ok(flag) => annotation.flag = Some(flag),
                    Err(_) => {
                        let col = line[..pos].chars().count() + 1;
                        let location =
                            SourceInfo::span(offset + col - 1, index + 1, col, name.len() + 2)
                                .with_file(file);
                        diagnostics.push(FlagDiagnostic {
                            annotation: name.to_string(),
                            hint: suggest(name).map(str::to_string),
                            location,
                        });
                    }
                }
            }
        }

        offset += line.chars().count() + 1;
        lines.push(annotation);
    }

    lines
}

/// Byte position of the `#` that opens a comment on this line, if any.
///
/// A `#` only opens a comment outside quotes and at the start of the line or
/// after whitespace (`a#b` is a plain scalar).
fn comment_start(line: &str) -> Option<usize> {
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut prev_is_space = true;

    for (pos, c) in line.char_indices() {
        if in_double {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_double = false;
            }
        } else if in_single {
            // '' inside a single-quoted scalar toggles twice and stays quoted
            if c == '\'' {
                in_single = false;
            }
        } else {
            match c {
                '#' if prev_is_space => return Some(pos),
                '"' if prev_is_space || is_indicator_boundary(line, pos) => in_double = true,
                '\'' if prev_is_space || is_indicator_boundary(line, pos) => in_single = true,
                _ => {}
            }
        }
        prev_is_space = c.is_whitespace();
    }

    None
}

/// Quotes open a scalar right after flow indicators too (`["a", 'b']`).
fn is_indicator_boundary(line: &str, pos: usize) -> bool {
    line[..pos]
        .chars()
        .next_back()
        .is_some_and(|c| matches!(c, '[' | '{' | ',' | ':' | '-'))
}

/// Suggest a flag for common misspellings.
fn suggest(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "final" => Some("final"),
        "top" => Some("top"),
        "bottom" => Some("bottom"),
        "finale" | "fianl" | "important" | "locked" | "lock" | "fixed" => Some("final"),
        "first" | "front" | "head" | "tpo" | "prepend" => Some("top"),
        "last" | "back" | "tail" | "botom" | "bottm" | "append" => Some("bottom"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> (Vec<LineAnnotation>, Vec<FlagDiagnostic>) {
        let mut diagnostics = Vec::new();
        let lines = scan_lines(content, None, &mut diagnostics);
        (lines, diagnostics)
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ParameterFlag::from_name("top"), Some(ParameterFlag::Top));
        assert_eq!(ParameterFlag::from_name("final"), Some(ParameterFlag::Final));
        assert_eq!(ParameterFlag::from_name("bottom"), Some(ParameterFlag::Bottom));
        assert_eq!(ParameterFlag::from_name("middle"), None);
    }

    #[test]
    fn test_from_str_error() {
        let err = "important".parse::<ParameterFlag>().unwrap_err();
        assert_eq!(err, UnknownFlag("important".into()));
    }

    #[test]
    fn test_display_round_trips_comment_form() {
        assert_eq!(ParameterFlag::Final.to_string(), "#!final");
        assert_eq!(ParameterFlag::Bottom.to_string(), "#!bottom");
    }

    #[test]
    fn test_scan_trailing_flags() {
        let (lines, diagnostics) = scan("a: 1  #!final\nb:\n  - x #!top\n  - y  #!bottom\n");
        assert!(diagnostics.is_empty());
        assert_eq!(lines[0].flag, Some(ParameterFlag::Final));
        assert_eq!(lines[1].flag, None);
        assert_eq!(lines[2].flag, Some(ParameterFlag::Top));
        assert_eq!(lines[3].flag, Some(ParameterFlag::Bottom));
    }

    #[test]
    fn test_plain_comments_are_not_flags() {
        let (lines, diagnostics) = scan("a: 1  # final\nb: 2 #final\n# !top\n");
        assert!(diagnostics.is_empty());
        assert!(lines.iter().all(|l| l.flag.is_none()));
    }

    #[test]
    fn test_hash_inside_quotes_or_words() {
        let (lines, _) = scan("a: \"x #!final\"\nb: 'y #!top'\nc: d#!bottom\n");
        assert!(lines.iter().all(|l| l.flag.is_none()));
    }

    #[test]
    fn test_bare_dash_detection() {
        let (lines, _) = scan("seq:\n  - #!bottom\n    k: v\n  - item\n");
        assert!(lines[1].bare_dash);
        assert_eq!(lines[1].flag, Some(ParameterFlag::Bottom));
        assert!(!lines[3].bare_dash);
    }

    #[test]
    fn test_unknown_annotation_diagnostic() {
        let (lines, diagnostics) = scan("a: 1\nb: 2  #!important\n");
        assert_eq!(lines[1].flag, None);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].annotation, "important");
        assert_eq!(diagnostics[0].hint.as_deref(), Some("final"));
        assert_eq!(diagnostics[0].location.line, 2);
        assert_eq!(diagnostics[0].location.col, 7);
        insta::assert_snapshot!(
            diagnostics[0].to_string(),
            @"unknown annotation '#!important' at 2:7 (did you mean '#!final'?)"
        );
    }

    #[test]
    fn test_unknown_annotation_without_hint() {
        let (_, diagnostics) = scan("a: 1  #!zzz\n");
        assert_eq!(diagnostics[0].hint, None);
        assert!(diagnostics[0].to_string().contains("valid flags are"));
    }
}
