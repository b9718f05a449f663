//! helm collaborator
//!
//! All helm interaction goes through [`HelmClient::exec`]; the higher level
//! operations are default methods built on it, so an implementation only has
//! to know how to run helm.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{KubeError, Result};

/// Captured output of a successful helm run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelmOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait HelmClient: Send + Sync {
    /// Run helm with `args`; a non-zero exit is a [`KubeError::HelmCommand`]
    async fn exec(&self, args: &[String]) -> Result<HelmOutput>;

    /// Installed helm version, e.g. `v3.14.2`
    async fn version(&self) -> Result<String> {
        let out = self.exec(&owned(&["version", "--template", "{{.Version}}"])).await?;
        Ok(out.stdout.trim().to_string())
    }

    /// Register a chart repository
    async fn add_repository(&self, name: &str, url: &str) -> Result<()> {
        self.exec(&owned(&["repo", "add", name, url])).await?;
        Ok(())
    }

    /// Root of helm's repository cache
    async fn cache_dir(&self) -> Result<PathBuf> {
        let out = self.exec(&owned(&["env", "HELM_REPOSITORY_CACHE"])).await?;
        Ok(PathBuf::from(out.stdout.trim()))
    }

    /// Fetch chart dependencies for a local chart directory
    async fn dependency_build(&self, chart_dir: &Path) -> Result<()> {
        let dir = chart_dir.display().to_string();
        match self.exec(&owned(&["dependency", "build", &dir])).await {
            Ok(_) => Ok(()),
            Err(KubeError::HelmCommand { stderr, .. }) => Err(KubeError::DependencyBuild {
                path: dir,
                message: stderr.trim().to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Live manifest of a release; empty when the release does not exist
    async fn get_manifest(&self, namespace: &str, release: &str) -> Result<String> {
        let args = owned(&["get", "manifest", release, "--namespace", namespace]);
        match self.exec(&args).await {
            Ok(out) => Ok(out.stdout),
            Err(e) if e.is_release_not_found() => {
                debug!(release, namespace, "release not installed, live manifest is empty");
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    /// User-supplied values of a release, as YAML
    async fn get_user_values(&self, namespace: &str, release: &str) -> Result<String> {
        let args = owned(&["get", "values", release, "--namespace", namespace, "--output", "yaml"]);
        Ok(self.exec(&args).await?.stdout)
    }

    /// Releases in a namespace, as YAML
    async fn list_releases(&self, namespace: &str) -> Result<String> {
        let args = owned(&["list", "--namespace", namespace, "--output", "yaml"]);
        Ok(self.exec(&args).await?.stdout)
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Runs the helm binary found on `PATH` (or an explicit program)
#[derive(Debug, Clone)]
pub struct HelmBinary {
    program: PathBuf,
}

impl HelmBinary {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("helm"),
        }
    }

    /// Use a specific helm executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for HelmBinary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HelmClient for HelmBinary {
    async fn exec(&self, args: &[String]) -> Result<HelmOutput> {
        debug!(program = %self.program.display(), ?args, "running helm");
        let output = Command::new(&self.program).args(args).output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(KubeError::HelmCommand {
                command: args.first().cloned().unwrap_or_default(),
                code: output.status.code().unwrap_or(-1),
                stdout,
                stderr,
            });
        }
        Ok(HelmOutput { stdout, stderr })
    }
}
