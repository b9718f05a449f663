//! Namespace creation and labelling ahead of a plot

use std::collections::{BTreeMap, HashSet};

use reckoner_core::{Course, NamespaceConfig, Release};
use tracing::{debug, info};

use crate::cluster::{ClusterClient, NamespaceState};
use crate::error::{KubeError, Result};

/// Create or patch the default namespace and the namespace of every release
///
/// Namespaces are listed once up front; each namespace is handled at most
/// once, with the policy of the first place it appears.
pub async fn manage_namespaces(
    cluster: &dyn ClusterClient,
    course: &Course,
    releases: &[Release],
) -> Result<()> {
    let live = cluster.list_namespaces().await?;
    let fallback = course.namespace_management.default.clone().unwrap_or_default();

    let mut targets: Vec<(&str, &NamespaceConfig)> = Vec::new();
    if let Some(default_ns) = course.default_namespace.as_deref() {
        targets.push((default_ns, &fallback));
    }
    for release in releases {
        let policy = release.namespace_management.as_ref().unwrap_or(&fallback);
        targets.push((release.namespace(), policy));
    }

    let mut handled = HashSet::new();
    for (name, policy) in targets {
        if name.is_empty() || !handled.insert(name) {
            continue;
        }
        create_or_patch(cluster, name, policy, &live).await?;
    }
    Ok(())
}

async fn create_or_patch(
    cluster: &dyn ClusterClient,
    name: &str,
    policy: &NamespaceConfig,
    live: &[NamespaceState],
) -> Result<()> {
    let failed = |e: KubeError| KubeError::Namespace {
        namespace: name.to_string(),
        message: e.to_string(),
    };
    let metadata = &policy.metadata;

    match live.iter().find(|ns| ns.name == name) {
        Some(existing) => {
            let overwrite = policy.overwrite();
            let annotations = keys_to_apply(overwrite, &metadata.annotations, &existing.annotations);
            let labels = keys_to_apply(overwrite, &metadata.labels, &existing.labels);
            debug!(namespace = name, overwrite, "patching namespace");
            cluster
                .patch_namespace(name, &annotations, &labels)
                .await
                .map_err(failed)
        }
        None => {
            info!(namespace = name, "creating namespace");
            cluster
                .create_namespace(name, &metadata.annotations, &metadata.labels)
                .await
                .map_err(failed)
        }
    }
}

/// Keys of `desired` to send to an existing namespace
///
/// Without overwrite, keys the namespace already carries are left alone even
/// when their values differ.
pub fn keys_to_apply(
    overwrite: bool,
    desired: &BTreeMap<String, String>,
    live: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    if overwrite {
        return desired.clone();
    }
    desired
        .iter()
        .filter(|(key, _)| !live.contains_key(*key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ClusterCall, MockCluster};
    use reckoner_core::{NamespaceManagement, NamespaceMetadata, NamespaceSettings};

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn policy(labels: &[(&str, &str)], overwrite: bool) -> NamespaceConfig {
        NamespaceConfig {
            metadata: NamespaceMetadata {
                annotations: BTreeMap::new(),
                labels: map(labels),
            },
            settings: NamespaceSettings {
                overwrite: Some(overwrite),
            },
        }
    }

    fn release(name: &str, namespace: &str, config: NamespaceConfig) -> Release {
        let mut release = Release::new(name);
        release.namespace = Some(namespace.into());
        release.namespace_management = Some(config);
        release
    }

    #[test]
    fn test_keys_to_apply() {
        let desired = map(&[("team", "infra"), ("tier", "gold")]);
        let live = map(&[("team", "platform")]);

        assert_eq!(keys_to_apply(false, &desired, &live), map(&[("tier", "gold")]));
        assert_eq!(keys_to_apply(true, &desired, &live), desired);
    }

    #[tokio::test]
    async fn test_creates_missing_and_patches_existing() {
        let cluster = MockCluster::new().with_namespace("existing", &[("team", "platform")]);
        let course = Course {
            default_namespace: Some("existing".into()),
            namespace_management: NamespaceManagement {
                default: Some(policy(&[("team", "infra"), ("env", "prod")], false)),
            },
            ..Default::default()
        };
        let releases = vec![
            release("a", "fresh", policy(&[("app", "a")], false)),
            release("b", "fresh", policy(&[("app", "b")], false)),
        ];

        manage_namespaces(&cluster, &course, &releases).await.unwrap();

        assert_eq!(
            cluster.calls(),
            vec![
                ClusterCall::Patch {
                    name: "existing".into(),
                    annotations: BTreeMap::new(),
                    labels: map(&[("env", "prod")]),
                },
                ClusterCall::Create {
                    name: "fresh".into(),
                    annotations: BTreeMap::new(),
                    labels: map(&[("app", "a")]),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_overwrite_sends_every_key() {
        let cluster = MockCluster::new().with_namespace("infra", &[("team", "platform")]);
        let releases = vec![release("a", "infra", policy(&[("team", "infra")], true))];

        manage_namespaces(&cluster, &Course::default(), &releases)
            .await
            .unwrap();

        assert_eq!(
            cluster.calls(),
            vec![ClusterCall::Patch {
                name: "infra".into(),
                annotations: BTreeMap::new(),
                labels: map(&[("team", "infra")]),
            }]
        );
    }

    #[tokio::test]
    async fn test_cluster_failure_is_a_namespace_error() {
        let cluster = MockCluster::new().failing();
        let releases = vec![release("a", "infra", NamespaceConfig::default())];

        let err = manage_namespaces(&cluster, &Course::default(), &releases)
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::Namespace { .. }));
        assert!(err.is_fatal());
    }
}
