//! Course data model
//!
//! A course is the declarative description of every helm release reckoner
//! manages, together with the defaults and policies applied to them. This is
//! the canonical in-memory shape; legacy files are migrated into it at load
//! time (see [`crate::legacy`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::scalar;
use crate::values::Values;

/// Schema generation every loaded course is normalized to
pub const CURRENT_SCHEMA: &str = "v2";

/// The root of a course file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub schema: Option<String>,

    /// Namespace for releases that do not name one
    #[serde(
        rename = "namespace",
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_namespace: Option<String>,

    /// Repository for releases that do not name one
    #[serde(
        rename = "repository",
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_repository: Option<String>,

    /// Kubeconfig context to run against
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub repositories: IndexMap<String, Repository>,

    #[serde(default, skip_serializing_if = "MinimumVersions::is_empty")]
    pub minimum_versions: MinimumVersions,

    #[serde(default, skip_serializing_if = "Hooks::is_empty")]
    pub hooks: Hooks,

    #[serde(default, skip_serializing_if = "NamespaceManagement::is_empty")]
    pub namespace_management: NamespaceManagement,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<SecretSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub releases: Vec<Release>,

    /// Extra arguments passed to every helm invocation
    #[serde(
        default,
        deserialize_with = "scalar::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub helm_args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitops: Option<GitOps>,
}

impl Course {
    /// Find a release by name
    pub fn release(&self, name: &str) -> Option<&Release> {
        self.releases.iter().find(|r| r.name == name)
    }

    /// Render the course as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Structural form used for schema validation
    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A chart source: either a helm registry or a git repository
///
/// Both kinds of field may be present; a non-empty `git` takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub git: Option<String>,

    /// Directory inside a git repository that holds the charts
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub path: Option<String>,
}

impl Repository {
    pub fn is_git(&self) -> bool {
        self.git.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumVersions {
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub helm: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reckoner: Option<String>,
}

impl MinimumVersions {
    pub fn is_empty(&self) -> bool {
        self.helm.is_none() && self.reckoner.is_none()
    }
}

/// Shell commands run around a release install
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hooks {
    #[serde(
        default,
        deserialize_with = "scalar::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub pre_install: Vec<String>,

    #[serde(
        default,
        deserialize_with = "scalar::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub post_install: Vec<String>,
}

impl Hooks {
    pub fn is_empty(&self) -> bool {
        self.pre_install.is_empty() && self.post_install.is_empty()
    }
}

/// Course-level namespace policy block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceManagement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<NamespaceConfig>,
}

impl NamespaceManagement {
    pub fn is_empty(&self) -> bool {
        self.default.is_none()
    }
}

/// Annotations and labels to maintain on a namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    #[serde(default, skip_serializing_if = "NamespaceMetadata::is_empty")]
    pub metadata: NamespaceMetadata,

    #[serde(default)]
    pub settings: NamespaceSettings,
}

impl NamespaceConfig {
    /// Whether existing keys on the live namespace may be replaced
    pub fn overwrite(&self) -> bool {
        self.settings.overwrite.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMetadata {
    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub annotations: BTreeMap<String, String>,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: BTreeMap<String, String>,
}

impl NamespaceMetadata {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.labels.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSettings {
    /// `None` means "not stated" and is filled from the course default
    #[serde(
        default,
        deserialize_with = "scalar::opt_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub overwrite: Option<bool>,
}

/// A secret resolved before the course is interpolated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpec {
    #[serde(deserialize_with = "scalar::string")]
    pub name: String,
    #[serde(deserialize_with = "scalar::string")]
    pub backend: String,
    #[serde(default, deserialize_with = "scalar::string_list")]
    pub script: Vec<String>,
}

/// GitOps application templates, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitOps {
    #[serde(
        default,
        deserialize_with = "scalar::opt_json",
        skip_serializing_if = "Option::is_none"
    )]
    pub argocd: Option<JsonValue>,
}

/// A single helm release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Release {
    #[serde(default, deserialize_with = "scalar::string")]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_management: Option<NamespaceConfig>,

    /// Chart name; the release name is used when empty
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub chart: Option<String>,

    #[serde(default, skip_serializing_if = "Hooks::is_empty")]
    pub hooks: Hooks,

    /// Chart version, or a git ref for git repositories
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub repository: Option<String>,

    /// Values files, relative to the course directory
    #[serde(
        default,
        deserialize_with = "scalar::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub files: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Values>,

    #[serde(
        default,
        deserialize_with = "scalar::opt_json",
        skip_serializing_if = "Option::is_none"
    )]
    pub gitops: Option<JsonValue>,

    #[serde(skip)]
    pub(crate) checkout: Option<GitCheckout>,
}

impl Release {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    /// Chart to install, falling back to the release name
    pub fn chart(&self) -> &str {
        self.chart.as_deref().unwrap_or(&self.name)
    }

    pub fn repository(&self) -> &str {
        self.repository.as_deref().unwrap_or_default()
    }

    /// Local checkout for charts that come from git
    pub fn checkout(&self) -> Option<&GitCheckout> {
        self.checkout.as_ref()
    }

    /// Attach the local checkout location; a release is checked out at most once
    pub fn with_checkout(mut self, checkout: GitCheckout) -> Result<Self> {
        if let Some(existing) = &self.checkout {
            return Err(CoreError::CheckoutAlreadySet {
                release: self.name,
                path: existing.clone_path.display().to_string(),
            });
        }
        self.checkout = Some(checkout);
        Ok(self)
    }
}

/// Where a git-sourced chart lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCheckout {
    /// Directory the repository is cloned into
    pub clone_path: PathBuf,
    /// Chart directory relative to `clone_path`
    pub chart_path: PathBuf,
}

impl GitCheckout {
    /// Absolute path of the chart inside the checkout
    pub fn chart_dir(&self) -> PathBuf {
        self.clone_path.join(&self.chart_path)
    }

    pub fn clone_path(&self) -> &Path {
        &self.clone_path
    }
}
