//! Inline release values

use serde::de::{self, Deserialize, Deserializer};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::yaml::resolve_plain;

/// Arbitrary values payload handed to helm as a values file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl<'de> Deserialize<'de> for Values {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = resolve_plain(serde_yaml::Value::deserialize(deserializer)?);
        serde_yaml::from_value(value)
            .map(Self)
            .map_err(de::Error::custom)
    }
}

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Render as a YAML document
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        path.split('.')
            .try_fold(&self.0, |current, part| current.get(part))
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Null => true,
            JsonValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}
