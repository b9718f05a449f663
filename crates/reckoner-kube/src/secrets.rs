//! Secrets resolved before a course is interpolated
//!
//! Each `secrets:` entry names a variable and a backend that produces its
//! value. Resolved values are handed to the course loader as interpolation
//! variables; the process environment is left alone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reckoner_core::{CourseLoader, LoadedCourse, SecretSpec, Variables, secret_specs};
use tokio::process::Command;
use tracing::debug;

use crate::error::{KubeError, Result};

/// Backend name for secrets produced by running a command
pub const SHELL_EXECUTOR: &str = "ShellExecutor";

#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Produce the value of one secret
    async fn resolve(&self, spec: &SecretSpec) -> Result<String>;
}

/// Runs the secret's `script` and uses its trimmed stdout
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    dir: PathBuf,
}

impl ShellExecutor {
    /// Scripts run with `dir` as working directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SecretSource for ShellExecutor {
    async fn resolve(&self, spec: &SecretSpec) -> Result<String> {
        let failed = |message: String| KubeError::Secret {
            name: spec.name.clone(),
            message,
        };

        if spec.backend != SHELL_EXECUTOR {
            return Err(failed(format!("unsupported backend '{}'", spec.backend)));
        }
        let Some((program, args)) = spec.script.split_first() else {
            return Err(failed("no script given".to_string()));
        };

        debug!(secret = %spec.name, program, "resolving secret");
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.dir)
            .output()
            .await
            .map_err(|e| failed(format!("failed to run {program}: {e}")))?;

        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Resolve every secret, in order
pub async fn resolve_secrets(
    source: &dyn SecretSource,
    specs: &[SecretSpec],
) -> Result<Vec<(String, String)>> {
    let mut resolved = Vec::with_capacity(specs.len());
    for spec in specs {
        resolved.push((spec.name.clone(), source.resolve(spec).await?));
    }
    Ok(resolved)
}

/// Load a course, resolving its secrets first
pub async fn load_course(
    path: &Path,
    loader: CourseLoader,
    source: &dyn SecretSource,
) -> Result<LoadedCourse> {
    let specs = secret_specs(path)?;
    let mut variables = Variables::from_env();
    variables.extend(resolve_secrets(source, &specs).await?);
    Ok(loader.with_variables(variables).load_file(path)?)
}
