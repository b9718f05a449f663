//! Reckoner Kube - helm, git and cluster integration for reckoner
//!
//! This crate provides:
//! - **Collaborators**: helm, git, cluster, hook and secret traits with process and kube backed implementations
//! - **Helm Arguments**: install and template command lines with transient values files
//! - **Diff Engine**: compare live release manifests with rendered templates
//! - **Namespace Management**: create and label namespaces ahead of a plot
//! - **Sessions**: plot, template, diff, update and get-manifests with continue-on-error
//! - **Import**: describe an installed release as a course entry

pub mod args;
pub mod cluster;
pub mod diff;
pub mod error;
pub mod git;
pub mod helm;
pub mod hooks;
pub mod import;
pub mod manifest;
pub mod namespace;
pub mod secrets;
pub mod session;

#[cfg(test)]
mod mock;

pub use args::{HelmAction, HelmInvocation, build_helm_args};
pub use cluster::{ClusterClient, KubeCluster, NamespaceState};
pub use diff::{DiffEngine, ManifestDiff, NEW_RESOURCE_MARKER, ReleaseDiff};
pub use error::{KubeError, Result};
pub use git::{DEFAULT_GIT_REF, GitCli, GitClient};
pub use helm::{HelmBinary, HelmClient, HelmOutput};
pub use hooks::{HookPhase, HookRunner, ShellHookRunner};
pub use import::{import_release, split_chart_version};
pub use manifest::{ManifestDocument, parse_documents, write_split};
pub use namespace::{keys_to_apply, manage_namespaces};
pub use secrets::{SHELL_EXECUTOR, SecretSource, ShellExecutor, load_course, resolve_secrets};
pub use session::{
    ReconciliationResult, ReleaseOutcome, ReleaseStage, ReleaseStatus, RenderedRelease, Session,
    SessionBuilder, SessionOptions, UpdateResult,
};
