//! YAML parser that builds AnnotatedYaml trees.

use crate::flag::{LineAnnotation, scan_lines};
use crate::{AnnotatedEntry, AnnotatedYaml, Error, FlagDiagnostic, ParameterFlag, Result, SourceInfo};
use yaml_rust2::Yaml;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Parse YAML from a string, producing an AnnotatedYaml tree.
///
/// Only the first document of a multi-document stream is parsed. An empty
/// document parses to a null scalar.
///
/// # Example
///
/// ```rust
/// use strata_yaml::parse;
///
/// let yaml = parse("always_yes: yes").unwrap();
/// assert!(yaml.is_hash());
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is not well-formed.
pub fn parse(content: &str) -> Result<AnnotatedYaml> {
    parse_impl(content, None, &mut Vec::new())
}

/// Parse YAML from a string with an associated filename.
///
/// # Example
///
/// ```rust
/// use strata_yaml::parse_file;
///
/// let yaml = parse_file("channels: [defaults]", ".apprc").unwrap();
/// assert_eq!(yaml.source_info.file, Some(".apprc".into()));
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is not well-formed.
pub fn parse_file(content: &str, filename: &str) -> Result<AnnotatedYaml> {
    parse_impl(content, Some(filename), &mut Vec::new())
}

/// Parse YAML and collect diagnostics for unknown `#!` annotations.
///
/// # Errors
///
/// Returns an error if the YAML is not well-formed.
pub fn parse_with_diagnostics(
    content: &str,
    filename: Option<&str>,
    diagnostics: &mut Vec<FlagDiagnostic>,
) -> Result<AnnotatedYaml> {
    parse_impl(content, filename, diagnostics)
}

fn parse_impl(
    content: &str,
    filename: Option<&str>,
    diagnostics: &mut Vec<FlagDiagnostic>,
) -> Result<AnnotatedYaml> {
    let lines = scan_lines(content, filename, diagnostics);
    let mut parser = Parser::new_from_str(content);
    let mut builder = AnnotatedBuilder::new(content, filename, lines);

    parser
        .load(&mut builder, false) // false = single document only
        .map_err(|e| Error::from(e).with_file(filename))?;

    builder.result()
}

/// Builder that implements MarkedEventReceiver to construct AnnotatedYaml.
struct AnnotatedBuilder<'a> {
    /// Source text as characters; yaml-rust2 markers index characters
    chars: Vec<char>,

    /// Character index at which each line starts
    line_starts: Vec<usize>,

    /// Flag comments per line (index = line - 1)
    lines: Vec<LineAnnotation>,

    /// Optional filename for source info
    filename: Option<&'a str>,

    /// Stack of nodes being constructed
    stack: Vec<BuildNode>,

    /// The completed root node
    root: Option<AnnotatedYaml>,

    /// First structural inconsistency seen in the event stream
    error: Option<Error>,
}

/// A node being constructed during parsing.
enum BuildNode {
    /// Building a sequence
    Sequence {
        start: usize,
        start_line: usize,
        flow: bool,
        items: Vec<AnnotatedYaml>,
    },

    /// Building a mapping
    Mapping {
        start: usize,
        entries: Vec<(AnnotatedYaml, Option<AnnotatedYaml>)>,
    },
}

impl<'a> AnnotatedBuilder<'a> {
    fn new(source: &str, filename: Option<&'a str>, lines: Vec<LineAnnotation>) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let mut line_starts = vec![0];
        for (i, c) in chars.iter().enumerate() {
            if *c == '\n' {
                line_starts.push(i + 1);
            }
        }

        Self {
            chars,
            line_starts,
            lines,
            filename,
            stack: Vec::new(),
            root: None,
            error: None,
        }
    }

    fn result(self) -> Result<AnnotatedYaml> {
        let empty = self.source_info(0, 0);
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(self
            .root
            .unwrap_or_else(|| AnnotatedYaml::new_scalar(Yaml::Null, empty)))
    }

    fn fail(&mut self, message: &str) {
        if self.error.is_none() {
            self.error = Some(
                Error::ParseError {
                    message: message.to_string(),
                    location: None,
                }
                .with_file(self.filename),
            );
        }
    }

    /// 1-based line containing the character at `index`.
    fn line_of(&self, index: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= index).max(1)
    }

    fn source_info(&self, index: usize, len: usize) -> SourceInfo {
        let line = self.line_of(index);
        let col = index - self.line_starts[line - 1] + 1;
        SourceInfo::span(index, line, col, len).with_file(self.filename)
    }

    fn annotation(&self, line: usize) -> LineAnnotation {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .copied()
            .unwrap_or_default()
    }

    /// Flag for an item starting on `line` of a block sequence whose first
    /// `-` is on `sequence_line`.
    ///
    /// A collection item may start on the line after its `-`
    /// (`- #!bottom` followed by an indented mapping). That `-` must belong
    /// to the same sequence, not to an enclosing one.
    fn item_flag(&self, line: usize, sequence_line: usize) -> Option<ParameterFlag> {
        let own = self.annotation(line);
        if own.flag.is_some() {
            return own.flag;
        }
        let previous_line = line.saturating_sub(1);
        let previous = self.annotation(previous_line);
        if previous_line >= sequence_line.max(1) && previous.bare_dash {
            previous.flag
        } else {
            None
        }
    }

    /// Flag for the value of a mapping entry whose key is `key`.
    ///
    /// A scalar value written on its own, more indented line carries the flag
    /// of that line, falling back to the key's line. Collection values always
    /// take the key's line; flags inside them belong to their items.
    fn value_flag(&self, key: &SourceInfo, value: &AnnotatedYaml) -> Option<ParameterFlag> {
        let own_line = value.source_info.line > key.line && value.source_info.col > key.col;
        if own_line && !value.is_array() && !value.is_hash() {
            if let Some(flag) = self.annotation(value.source_info.line).flag {
                return Some(flag);
            }
        }
        self.annotation(key.line).flag
    }

    fn push_complete(&mut self, mut node: AnnotatedYaml) {
        let line = node.source_info.line;
        let flag = match self.stack.last() {
            Some(BuildNode::Sequence {
                flow: false,
                start_line,
                ..
            }) => self.item_flag(line, *start_line),
            Some(BuildNode::Mapping { entries, .. }) => match entries.last() {
                Some((key, None)) => self.value_flag(&key.source_info, &node),
                _ => None,
            },
            _ => None,
        };

        let Some(parent) = self.stack.last_mut() else {
            self.root = Some(node);
            return;
        };

        match parent {
            BuildNode::Sequence { items, .. } => {
                node.flag = flag;
                items.push(node);
            }
            BuildNode::Mapping { entries, .. } => match entries.last_mut() {
                Some((_, value @ None)) => {
                    node.flag = flag;
                    *value = Some(node);
                }
                _ => entries.push((node, None)),
            },
        }
    }
}

impl MarkedEventReceiver for AnnotatedBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        match ev {
            Event::Nothing => {}

            Event::StreamStart => {}
            Event::StreamEnd => {}
            Event::DocumentStart => {}
            Event::DocumentEnd => {}

            Event::Scalar(value, style, _anchor_id, _tag) => {
                let source_info = self.source_info(marker.index(), value.chars().count());
                let yaml = parse_scalar_value(&value, style);
                self.push_complete(AnnotatedYaml::new_scalar(yaml, source_info));
            }

            Event::SequenceStart(_anchor_id, _tag) => {
                let start = marker.index();
                let flow = self.chars.get(start) == Some(&'[');
                self.stack.push(BuildNode::Sequence {
                    start,
                    start_line: self.line_of(start),
                    flow,
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => match self.stack.pop() {
                Some(BuildNode::Sequence { start, items, .. }) => {
                    let len = marker.index().saturating_sub(start);
                    let source_info = self.source_info(start, len);
                    let yaml = Yaml::Array(items.iter().map(|n| n.yaml.clone()).collect());
                    self.push_complete(AnnotatedYaml::new_array(yaml, source_info, items));
                }
                _ => self.fail("SequenceEnd without SequenceStart"),
            },

            Event::MappingStart(_anchor_id, _tag) => {
                self.stack.push(BuildNode::Mapping {
                    start: marker.index(),
                    entries: Vec::new(),
                });
            }

            Event::MappingEnd => match self.stack.pop() {
                Some(BuildNode::Mapping { start, entries }) => {
                    let len = marker.index().saturating_sub(start);
                    let source_info = self.source_info(start, len);

                    let mut hash_entries = Vec::with_capacity(entries.len());
                    let mut yaml_pairs = Vec::with_capacity(entries.len());
                    for (key, value) in entries {
                        let Some(value) = value else {
                            self.fail("Mapping entry without value");
                            return;
                        };
                        yaml_pairs.push((key.yaml.clone(), value.yaml.clone()));
                        hash_entries.push(AnnotatedEntry::new(key, value));
                    }

                    let yaml = Yaml::Hash(yaml_pairs.into_iter().collect());
                    self.push_complete(AnnotatedYaml::new_hash(yaml, source_info, hash_entries));
                }
                _ => self.fail("MappingEnd without MappingStart"),
            },

            Event::Alias(_anchor_id) => {
                // Anchors are not tracked; aliases become null
                let source_info = self.source_info(marker.index(), 0);
                self.push_complete(AnnotatedYaml::new_scalar(Yaml::Null, source_info));
            }
        }
    }
}

/// Parse a scalar string value into the appropriate Yaml type.
///
/// Follows the YAML 1.2 core schema: `yes`/`no`/`on`/`off` stay strings and
/// quoted scalars are always strings.
fn parse_scalar_value(value: &str, style: TScalarStyle) -> Yaml {
    if !matches!(style, TScalarStyle::Plain) {
        return Yaml::String(value.to_string());
    }

    match value {
        "null" | "Null" | "NULL" | "~" | "" => return Yaml::Null,
        "true" | "True" | "TRUE" => return Yaml::Boolean(true),
        "false" | "False" | "FALSE" => return Yaml::Boolean(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "-.inf" | ".nan" | ".NaN" | ".NAN" => {
            return Yaml::Real(value.to_string());
        }
        _ => {}
    }

    if let Ok(i) = value.parse::<i64>() {
        return Yaml::Integer(i);
    }
    if let Some(hex) = value.strip_prefix("0x") {
        if let Ok(i) = i64::from_str_radix(hex, 16) {
            return Yaml::Integer(i);
        }
    }
    if let Some(oct) = value.strip_prefix("0o") {
        if let Ok(i) = i64::from_str_radix(oct, 8) {
            return Yaml::Integer(i);
        }
    }

    // Rust accepts "inf" and "NaN" as floats; YAML does not.
    let numeric = value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if numeric && value.parse::<f64>().is_ok() {
        return Yaml::Real(value.to_string());
    }

    Yaml::String(value.to_string())
}
