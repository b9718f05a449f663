//! Legacy (v1) course schema and migration
//!
//! v1 courses describe releases as a `charts` map keyed by release name, and
//! allow a release's repository to be declared inline. Migration keeps the
//! file order of the map and turns inline git repositories into named
//! repository entries.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::course::{
    CURRENT_SCHEMA, Course, Hooks, MinimumVersions, NamespaceConfig, NamespaceManagement,
    Release, Repository, SecretSpec,
};
use crate::scalar;
use crate::values::Values;

/// A v1 course file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyCourse {
    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub namespace: Option<String>,

    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub repository: Option<String>,

    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub context: Option<String>,

    #[serde(default)]
    pub repositories: IndexMap<String, Repository>,

    #[serde(default)]
    pub minimum_versions: MinimumVersions,

    #[serde(default)]
    pub hooks: Hooks,

    #[serde(default)]
    pub namespace_management: NamespaceManagement,

    #[serde(default)]
    pub secrets: Vec<SecretSpec>,

    #[serde(default, deserialize_with = "scalar::string_list")]
    pub helm_args: Vec<String>,

    #[serde(default)]
    pub charts: IndexMap<String, LegacyRelease>,
}

/// A v1 chart entry; the release name is its key in `charts`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyRelease {
    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub namespace: Option<String>,

    #[serde(default)]
    pub namespace_management: Option<NamespaceConfig>,

    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub chart: Option<String>,

    #[serde(default)]
    pub hooks: Hooks,

    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub version: Option<String>,

    #[serde(default)]
    pub repository: Option<LegacyRepository>,

    #[serde(default, deserialize_with = "scalar::string_list")]
    pub files: Vec<String>,

    #[serde(default)]
    pub values: Option<Values>,

    #[serde(default, deserialize_with = "scalar::opt_json")]
    pub gitops: Option<JsonValue>,
}

/// Repository reference on a v1 chart
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyRepository {
    /// Key into the course `repositories` map
    Named(String),
    /// Repository declared on the chart itself
    Inline(InlineRepository),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InlineRepository {
    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub git: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string")]
    pub path: Option<String>,
}

/// Name of the repository synthesized for an inline git repository
pub fn git_repository_name(release: &str) -> String {
    format!("{release}-git-repository")
}

impl LegacyCourse {
    /// Convert to the current schema
    pub fn migrate(self) -> Course {
        let mut repositories = self.repositories;
        let mut releases = Vec::with_capacity(self.charts.len());

        for (name, chart) in self.charts {
            let repository = match chart.repository {
                None => None,
                Some(LegacyRepository::Named(repo)) => Some(repo).filter(|r| !r.is_empty()),
                Some(LegacyRepository::Inline(inline)) => match inline.git {
                    Some(git) => {
                        debug!(release = %name, "converting inline git repository to a named repository");
                        let repo_name = git_repository_name(&name);
                        repositories.insert(
                            repo_name.clone(),
                            Repository {
                                url: None,
                                git: Some(git),
                                path: inline.path,
                            },
                        );
                        Some(repo_name)
                    }
                    None => inline.name,
                },
            };

            releases.push(Release {
                namespace: chart.namespace,
                namespace_management: chart.namespace_management,
                chart: chart.chart,
                hooks: chart.hooks,
                version: chart.version,
                repository,
                files: chart.files,
                values: chart.values,
                gitops: chart.gitops,
                ..Release::new(name)
            });
        }

        Course {
            schema: Some(CURRENT_SCHEMA.to_string()),
            default_namespace: self.namespace,
            default_repository: self.repository,
            context: self.context,
            repositories,
            minimum_versions: self.minimum_versions,
            hooks: self.hooks,
            namespace_management: self.namespace_management,
            secrets: self.secrets,
            releases,
            helm_args: self.helm_args,
            gitops: None,
        }
    }
}
