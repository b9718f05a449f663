//! Splitting rendered helm output into individual resources

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::{KubeError, Result};

static SOURCE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^# Source: (.*)$").expect("valid regex"));

/// One resource from a multi-document manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    /// Template path from the `# Source:` comment helm writes
    pub source: String,
    pub kind: String,
    pub name: String,
    /// Normalized YAML with mapping keys sorted
    pub content: String,
}

impl ManifestDocument {
    /// Whether two documents describe the same resource
    pub fn same_resource(&self, other: &ManifestDocument) -> bool {
        self.name == other.name && self.kind == other.kind && self.source == other.source
    }
}

/// Split `text` on document separators and parse each resource
///
/// Chunks holding nothing but comments are skipped. Content is re-serialized
/// with sorted keys so that documents rendered in a different key order
/// compare equal.
pub fn parse_documents(text: &str) -> Result<Vec<ManifestDocument>> {
    split_chunks(text)
        .into_iter()
        .filter_map(|chunk| parse_chunk(&chunk).transpose())
        .collect()
}

fn split_chunks(text: &str) -> Vec<String> {
    let mut chunks = vec![String::new()];
    for line in text.lines() {
        if line.trim_end() == "---" || line.starts_with("--- ") {
            chunks.push(String::new());
            continue;
        }
        if let Some(current) = chunks.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    chunks
}

fn parse_chunk(chunk: &str) -> Result<Option<ManifestDocument>> {
    let value: Value = serde_yaml::from_str(chunk)
        .map_err(|e| KubeError::InvalidManifest(e.to_string()))?;

    let map = match value {
        Value::Null => return Ok(None),
        Value::Mapping(map) => map,
        other => {
            return Err(KubeError::InvalidManifest(format!(
                "document must be a mapping, found {}",
                type_name(&other)
            )));
        }
    };

    let source = SOURCE_COMMENT
        .captures(chunk)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end().to_string())
        .unwrap_or_default();
    let kind = map
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let name = map
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let content = serde_yaml::to_string(&sorted(Value::Mapping(map)))?;

    Ok(Some(ManifestDocument {
        source,
        kind,
        name,
        content,
    }))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(Value, Value)> =
                map.into_iter().map(|(k, v)| (k, sorted(v))).collect();
            entries.sort_by_key(|(k, _)| key_text(k));
            Value::Mapping(entries.into_iter().collect::<Mapping>())
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(sorted).collect()),
        Value::Tagged(mut tagged) => {
            tagged.value = sorted(tagged.value);
            Value::Tagged(tagged)
        }
        scalar => scalar,
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

/// Write every rendered document of a release to `<base>/<release>/<Kind>_<name>.yml`
pub fn write_split(text: &str, base: &Path, release: &str) -> Result<Vec<PathBuf>> {
    let dir = base.join(release);
    std::fs::create_dir_all(&dir)?;

    parse_documents(text)?
        .into_iter()
        .map(|doc| {
            let path = dir.join(format!("{}_{}.yml", doc.kind, doc.name));
            std::fs::write(&path, format!("---\n{}", doc.content))?;
            Ok(path)
        })
        .collect()
}
