//! Cluster collaborator for namespace management

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::config::KubeConfigOptions;
use tracing::debug;

use crate::error::{KubeError, Result};

/// The parts of a live namespace reckoner looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceState {
    pub name: String,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceState>>;

    async fn create_namespace(
        &self,
        name: &str,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Add or replace the given keys on an existing namespace
    async fn patch_namespace(
        &self,
        name: &str,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<()>;
}

/// Kubernetes API backed cluster client
#[derive(Clone)]
pub struct KubeCluster {
    client: kube::Client,
}

impl KubeCluster {
    /// Connect using the given kubeconfig context, or the inferred config
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let config = match context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.to_string()),
                    ..Default::default()
                };
                kube::Config::from_kubeconfig(&options)
                    .await
                    .map_err(|e| KubeError::Kubeconfig(e.to_string()))?
            }
            None => kube::Config::infer()
                .await
                .map_err(|e| KubeError::Kubeconfig(e.to_string()))?,
        };
        debug!(cluster = %config.cluster_url, "connected to cluster");
        Ok(Self {
            client: kube::Client::try_from(config)?,
        })
    }

    /// Use an existing client
    pub fn with_client(client: kube::Client) -> Self {
        Self { client }
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then(|| map.clone())
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceState>> {
        let list = self.namespaces().list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .map(|ns| NamespaceState {
                name: ns.metadata.name.unwrap_or_default(),
                annotations: ns.metadata.annotations.unwrap_or_default(),
                labels: ns.metadata.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn create_namespace(
        &self,
        name: &str,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<()> {
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                annotations: non_empty(annotations),
                labels: non_empty(labels),
                ..Default::default()
            },
            ..Default::default()
        };
        self.namespaces()
            .create(&PostParams::default(), &namespace)
            .await?;
        Ok(())
    }

    async fn patch_namespace(
        &self,
        name: &str,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<()> {
        let patch = serde_json::json!({
            "metadata": {
                "annotations": annotations,
                "labels": labels,
            }
        });
        self.namespaces()
            .patch(name, &PatchParams::default(), &Patch::Strategic(&patch))
            .await?;
        Ok(())
    }
}
