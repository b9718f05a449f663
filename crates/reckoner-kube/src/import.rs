//! Building a course release from a release already installed by helm

use reckoner_core::version::parse_version;
use reckoner_core::{Release, Values};
use serde::Deserialize;

use crate::error::{KubeError, Result};
use crate::helm::HelmClient;

/// One entry of `helm list --output yaml`
#[derive(Debug, Clone, Deserialize)]
struct ListedRelease {
    name: String,
    namespace: String,
    chart: String,
}

/// Split helm's `<chart>-<version>` on the last hyphen
///
/// The version part must be a valid semantic version.
pub fn split_chart_version(chart: &str) -> Result<(String, String)> {
    let Some((name, version)) = chart.rsplit_once('-') else {
        return Err(KubeError::ChartVersion {
            chart: chart.to_string(),
            reason: "expected at least one hyphen between chart name and version".to_string(),
        });
    };
    if parse_version(version).is_err() {
        return Err(KubeError::ChartVersion {
            chart: chart.to_string(),
            reason: format!("{version} is not a valid semantic version"),
        });
    }
    Ok((name.to_string(), version.to_string()))
}

/// Describe an installed release as a course release entry
pub async fn import_release(
    helm: &dyn HelmClient,
    namespace: &str,
    release: &str,
    repository: &str,
) -> Result<Release> {
    let listed: Option<Vec<ListedRelease>> =
        serde_yaml::from_str(&helm.list_releases(namespace).await?)?;
    let found = listed
        .unwrap_or_default()
        .into_iter()
        .find(|r| r.name == release)
        .ok_or_else(|| KubeError::ReleaseNotFound {
            name: release.to_string(),
            namespace: namespace.to_string(),
        })?;

    let (chart, version) = split_chart_version(&found.chart)?;
    let values = Values::from_yaml(&helm.get_user_values(namespace, release).await?)?;

    let mut imported = Release::new(found.name);
    imported.namespace = Some(found.namespace);
    imported.chart = Some(chart);
    imported.version = Some(version);
    imported.repository = Some(repository.to_string());
    imported.values = (!values.is_empty()).then_some(values);
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHelm;

    const LIST: &str = r#"- name: ingress
  namespace: infra
  revision: "3"
  status: deployed
  chart: ingress-nginx-4.10.1
  app_version: 1.10.1
"#;

    #[test]
    fn test_split_chart_version() {
        assert_eq!(
            split_chart_version("ingress-nginx-4.10.1").unwrap(),
            ("ingress-nginx".to_string(), "4.10.1".to_string())
        );
        assert!(split_chart_version("nginx").is_err());
        assert!(split_chart_version("nginx-latest").is_err());
    }

    #[tokio::test]
    async fn test_import_release() {
        let helm = MockHelm::new()
            .with_release_list("infra", LIST)
            .with_user_values("infra", "ingress", "controller:\n  replicaCount: 2\n");

        let release = import_release(&helm, "infra", "ingress", "ingress-nginx")
            .await
            .unwrap();

        assert_eq!(release.name, "ingress");
        assert_eq!(release.namespace(), "infra");
        assert_eq!(release.chart(), "ingress-nginx");
        assert_eq!(release.version.as_deref(), Some("4.10.1"));
        assert_eq!(release.repository(), "ingress-nginx");
        assert_eq!(
            release.values.unwrap().get("controller.replicaCount"),
            Some(&serde_json::json!(2))
        );
    }

    #[tokio::test]
    async fn test_import_without_values() {
        let helm = MockHelm::new()
            .with_release_list("infra", LIST)
            .with_user_values("infra", "ingress", "null\n");

        let release = import_release(&helm, "infra", "ingress", "stable").await.unwrap();
        assert!(release.values.is_none());
    }

    #[tokio::test]
    async fn test_import_unknown_release() {
        let helm = MockHelm::new().with_release_list("infra", LIST);
        let err = import_release(&helm, "infra", "missing", "stable")
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::ReleaseNotFound { .. }));
    }
}
