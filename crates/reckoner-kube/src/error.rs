//! Error types for reckoner-kube

use reckoner_core::CoreError;
use thiserror::Error;

/// Result type for reckoner-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while reconciling releases
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Course loading, validation, version or selection failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Kubeconfig could not be loaded
    #[error("could not load kubeconfig: {0}")]
    Kubeconfig(String),

    /// A hook exited non-zero or could not be started
    #[error("{phase} hook `{command}` failed: {message}")]
    HookFailed {
        phase: String,
        command: String,
        message: String,
    },

    /// Cloning, fetching or checking out a git repository failed
    #[error("git error for {repository}: {message}")]
    Git { repository: String, message: String },

    /// `helm dependency build` failed for a checked out chart
    #[error("dependency build failed in {path}: {message}")]
    DependencyBuild { path: String, message: String },

    /// helm exited non-zero
    #[error("helm {command} failed with exit code {code}: {stderr}")]
    HelmCommand {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// Namespace creation or patching failed
    #[error("could not manage namespace '{namespace}': {message}")]
    Namespace { namespace: String, message: String },

    /// A secret could not be resolved
    #[error("could not resolve secret {name}: {message}")]
    Secret { name: String, message: String },

    /// Release not found
    #[error("release '{name}' not found in namespace '{namespace}'")]
    ReleaseNotFound { name: String, namespace: String },

    /// A deployed chart string could not be split into name and version
    #[error("could not parse chart version from {chart}: {reason}")]
    ChartVersion { chart: String, reason: String },

    /// Invalid manifest document
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Whether this error ends the session even when continuing on error
    ///
    /// Whether a failure outside any single release stops the session even
    /// under continue-on-error
    ///
    /// Errors raised by a release's own steps never reach this check.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            KubeError::HookFailed { .. }
                | KubeError::Git { .. }
                | KubeError::DependencyBuild { .. }
                | KubeError::HelmCommand { .. }
                | KubeError::InvalidManifest(_)
        )
    }

    /// Whether helm reported that the release does not exist
    pub fn is_release_not_found(&self) -> bool {
        matches!(self, KubeError::HelmCommand { stderr, .. } if stderr.contains("release: not found"))
    }
}
