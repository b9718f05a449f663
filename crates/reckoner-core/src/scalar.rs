//! Lenient scalar fields
//!
//! The loader keeps the source text of plain scalars that look like numbers
//! or booleans (see [`crate::yaml::resolve_plain`]). String fields read that
//! text, so `version: 1.10` stays `1.10`; typed fields resolve it first.

use std::collections::BTreeMap;

use serde::de::{self, Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use serde_yaml::Value;

use crate::yaml::resolve_plain;

fn to_text<E: de::Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Tagged(tagged) => to_text(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => {
            Err(E::custom("expected a scalar, found a collection"))
        }
    }
}

/// Scalar as `String`, null becomes empty
pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(to_text(Value::deserialize(deserializer)?)?.unwrap_or_default())
}

/// Scalar as `Option<String>`, null and empty become `None`
pub(crate) fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(to_text(Value::deserialize(deserializer)?)?.filter(|s| !s.is_empty()))
}

/// A single scalar or a list of scalars
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Sequence(items) => items
            .into_iter()
            .filter_map(|item| to_text(item).transpose())
            .collect(),
        other => Ok(to_text(other)?.into_iter().collect()),
    }
}

/// String map whose values may be any scalar; null values are dropped
pub(crate) fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<BTreeMap<String, Value>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| to_text(value).map(|t| t.map(|t| (key, t))).transpose())
        .collect()
}

pub(crate) fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match resolve_plain(Value::deserialize(deserializer)?) {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        _ => Err(de::Error::custom("expected a boolean")),
    }
}

/// Free-form structure with plain scalars retyped
pub(crate) fn opt_json<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    match resolve_plain(Value::deserialize(deserializer)?) {
        Value::Null => Ok(None),
        value => serde_yaml::from_value(value)
            .map(Some)
            .map_err(de::Error::custom),
    }
}
