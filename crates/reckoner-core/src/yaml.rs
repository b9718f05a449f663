//! Interpolating YAML loader
//!
//! Course files are read at the event level so that the style of each scalar
//! is still known when it is interpolated. Every value scalar has its variable
//! references expanded. Plain (unquoted) scalars are then retyped from the
//! expanded text, so `replicas: $COUNT` with `COUNT=3` yields an integer while
//! `tag: "$VERSION"` always stays a string. Mapping keys are left untouched.
//!
//! A plain scalar that retypes to a number or boolean is emitted tagged with
//! [`PLAIN_TAG`] around its text, so string fields can still read `1.10` as
//! written. [`resolve_plain`] turns those into typed values.

use std::collections::HashMap;

use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::TScalarStyle;

use crate::env::{Variables, expand};

const MERGE_KEY: &str = "<<";

/// Tag wrapping the source text of a retyped plain scalar
pub const PLAIN_TAG: &str = "!reckoner/plain";

/// Failure modes of [`parse_interpolated`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The document is not well-formed YAML
    Syntax(String),
    /// One or more referenced variables are unset
    Unresolved(Vec<String>),
}

/// Parse the first document in `source`, interpolating values from `vars`
pub fn parse_interpolated(source: &str, vars: &Variables) -> Result<Value, LoadError> {
    parse(source, Some(vars))
}

/// Parse the first document in `source` without interpolation
///
/// Variable references are kept verbatim; plain scalars are marked the same
/// way as in [`parse_interpolated`].
pub fn parse_plain(source: &str) -> Result<Value, LoadError> {
    parse(source, None)
}

fn parse(source: &str, vars: Option<&Variables>) -> Result<Value, LoadError> {
    let mut builder = ValueBuilder::new(vars);
    let mut parser = Parser::new_from_str(source);
    parser
        .load(&mut builder, false)
        .map_err(|e| LoadError::Syntax(e.to_string()))?;

    if !builder.missing.is_empty() {
        return Err(LoadError::Unresolved(builder.missing));
    }
    Ok(builder.root.unwrap_or(Value::Null))
}

/// Retype a plain scalar the way course files expect
///
/// Recognized forms, in order: null, booleans (`true/yes/on`,
/// `false/no/off`, any case), integers, then floats. Anything else stays a
/// string.
pub fn retype_plain(raw: String) -> Value {
    match raw.as_str() {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        _ => {}
    }

    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => return Value::Bool(true),
        "false" | "no" | "off" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(u) = raw.parse::<u64>() {
        return Value::Number(u.into());
    }
    // `inf` and `nan` parse as f64 but are not numbers in a course file
    if raw.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Value::Number(f.into());
            }
        }
    }

    Value::String(raw)
}

fn plain_scalar(raw: String) -> Value {
    match retype_plain(raw.clone()) {
        Value::Bool(_) | Value::Number(_) => Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(PLAIN_TAG),
            value: Value::String(raw),
        })),
        other => other,
    }
}

/// Replace every plain-scalar marker in `value` with its retyped value
pub fn resolve_plain(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) if tagged.tag == PLAIN_TAG => match tagged.value {
            Value::String(raw) => retype_plain(raw),
            other => other,
        },
        Value::Tagged(mut tagged) => {
            tagged.value = resolve_plain(tagged.value);
            Value::Tagged(tagged)
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(resolve_plain).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, resolve_plain(v)))
                .collect(),
        ),
        other => other,
    }
}

enum Frame {
    Sequence {
        anchor: usize,
        items: Vec<Value>,
    },
    Mapping {
        anchor: usize,
        entries: Mapping,
        key: Option<Value>,
        merges: Vec<Mapping>,
    },
}

struct ValueBuilder<'a> {
    vars: Option<&'a Variables>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Value>,
    root: Option<Value>,
    missing: Vec<String>,
}

impl<'a> ValueBuilder<'a> {
    fn new(vars: Option<&'a Variables>) -> Self {
        Self {
            vars,
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            missing: Vec::new(),
        }
    }

    fn expecting_key(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Mapping { key: None, .. }))
    }

    fn remember(&mut self, anchor: usize, value: &Value) {
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }
    }

    fn scalar(&mut self, raw: String, style: TScalarStyle, explicit_str: bool) -> Value {
        if self.expecting_key() {
            return Value::String(raw);
        }

        let expanded = match self.vars.map(|vars| expand(&raw, vars)) {
            None => raw,
            Some(Ok(expanded)) => expanded,
            Some(Err(names)) => {
                for name in names {
                    if !self.missing.contains(&name) {
                        self.missing.push(name);
                    }
                }
                raw
            }
        };

        let quoted = matches!(
            style,
            TScalarStyle::SingleQuoted
                | TScalarStyle::DoubleQuoted
                | TScalarStyle::Literal
                | TScalarStyle::Folded
        );
        if quoted || explicit_str {
            Value::String(expanded)
        } else {
            plain_scalar(expanded)
        }
    }

    fn push(&mut self, value: Value) {
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping {
                entries,
                key,
                merges,
                ..
            }) => match key.take() {
                None => *key = Some(value),
                Some(Value::String(k)) if k == MERGE_KEY => match value {
                    Value::Mapping(m) => merges.push(m),
                    Value::Sequence(seq) => merges.extend(seq.into_iter().filter_map(|v| match v {
                        Value::Mapping(m) => Some(m),
                        _ => None,
                    })),
                    other => {
                        entries.insert(Value::String(k), other);
                    }
                },
                Some(k) => {
                    entries.insert(k, value);
                }
            },
        }
    }
}

impl EventReceiver for ValueBuilder<'_> {
    fn on_event(&mut self, ev: Event) {
        match ev {
            Event::Scalar(raw, style, anchor, tag) => {
                let explicit_str = tag.as_ref().is_some_and(|t| t.suffix == "str");
                let value = self.scalar(raw, style, explicit_str);
                self.remember(anchor, &value);
                self.push(value);
            }
            Event::Alias(id) => {
                let value = self.anchors.get(&id).cloned().unwrap_or(Value::Null);
                self.push(value);
            }
            Event::SequenceStart(anchor, ..) => self.stack.push(Frame::Sequence {
                anchor,
                items: Vec::new(),
            }),
            Event::MappingStart(anchor, ..) => self.stack.push(Frame::Mapping {
                anchor,
                entries: Mapping::new(),
                key: None,
                merges: Vec::new(),
            }),
            Event::SequenceEnd => {
                if let Some(Frame::Sequence { anchor, items }) = self.stack.pop() {
                    let value = Value::Sequence(items);
                    self.remember(anchor, &value);
                    self.push(value);
                }
            }
            Event::MappingEnd => {
                if let Some(Frame::Mapping {
                    anchor,
                    mut entries,
                    merges,
                    ..
                }) = self.stack.pop()
                {
                    // explicit keys win over merged ones, earlier merges over later
                    for merged in merges {
                        for (k, v) in merged {
                            if !entries.contains_key(&k) {
                                entries.insert(k, v);
                            }
                        }
                    }
                    let value = Value::Mapping(entries);
                    self.remember(anchor, &value);
                    self.push(value);
                }
            }
            _ => {}
        }
    }
}
