//! git collaborator for charts that live in git repositories

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{KubeError, Result};

/// Ref checked out when a git release does not name a version
pub const DEFAULT_GIT_REF: &str = "master";

#[async_trait]
pub trait GitClient: Send + Sync {
    /// Make `path` a clone of `url` with `reference` checked out
    ///
    /// The clone is created when missing, refreshed when present and
    /// recreated when `path` exists but is not a git repository.
    async fn checkout(&self, url: &str, path: &Path, reference: &str) -> Result<()>;
}

/// Drives the `git` executable
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn git(&self, url: &str, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut command = Command::new("git");
        if let Some(dir) = dir {
            command.arg("-C").arg(dir);
        }
        debug!(?dir, ?args, "running git");
        let output = command.args(args).output().await.map_err(|e| KubeError::Git {
            repository: url.to_string(),
            message: format!("failed to run git: {e}"),
        })?;

        if !output.status.success() {
            return Err(KubeError::Git {
                repository: url.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn clone_into(&self, url: &str, path: &Path) -> Result<()> {
        let target = path.display().to_string();
        self.git(url, None, &["clone", url, &target]).await?;
        Ok(())
    }

    async fn prepare(&self, url: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            tokio::fs::create_dir_all(path).await?;
        }

        if is_empty_dir(path).await? {
            return self.clone_into(url, path).await;
        }

        if self.git(url, Some(path), &["rev-parse", "--git-dir"]).await.is_err() {
            debug!(path = %path.display(), "not a git repository, cloning again");
            tokio::fs::remove_dir_all(path).await?;
            tokio::fs::create_dir_all(path).await?;
            return self.clone_into(url, path).await;
        }
        Ok(())
    }

    async fn resolve(&self, url: &str, path: &Path, reference: &str) -> Result<String> {
        let direct = format!("{reference}^{{commit}}");
        if let Ok(hash) = self.git(url, Some(path), &["rev-parse", "--verify", &direct]).await {
            return Ok(hash);
        }
        let remote = format!("origin/{reference}^{{commit}}");
        self.git(url, Some(path), &["rev-parse", "--verify", &remote])
            .await
            .map_err(|_| KubeError::Git {
                repository: url.to_string(),
                message: format!("could not resolve git revision {reference}"),
            })
    }
}

async fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = tokio::fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_none())
}

#[async_trait]
impl GitClient for GitCli {
    async fn checkout(&self, url: &str, path: &Path, reference: &str) -> Result<()> {
        self.prepare(url, path).await?;
        self.git(url, Some(path), &["fetch", "--tags", "--force", "origin"]).await?;
        let hash = self.resolve(url, path, reference).await?;
        debug!(url, reference, %hash, "checking out");
        self.git(url, Some(path), &["checkout", "--force", &hash]).await?;
        Ok(())
    }
}
