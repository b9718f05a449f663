//! Pre and post install hooks
//!
//! Hooks are shell commands from the course. They run one at a time, each to
//! completion, with the course directory as working directory.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{KubeError, Result};

/// When a hook runs relative to the helm invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    PreInstall,
    PostInstall,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::PreInstall => write!(f, "pre_install"),
            HookPhase::PostInstall => write!(f, "post_install"),
        }
    }
}

#[async_trait]
pub trait HookRunner: Send + Sync {
    /// Run one hook command in `dir` and return its combined output
    async fn run(&self, phase: HookPhase, command: &str, dir: &Path) -> Result<String>;
}

/// Runs hooks through `sh -c`
#[derive(Debug, Clone, Default)]
pub struct ShellHookRunner;

impl ShellHookRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HookRunner for ShellHookRunner {
    async fn run(&self, phase: HookPhase, command: &str, dir: &Path) -> Result<String> {
        let failed = |message: String| KubeError::HookFailed {
            phase: phase.to_string(),
            command: command.to_string(),
            message,
        };

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| failed(format!("failed to start: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        debug!(%phase, command, output = %combined, "hook finished");

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit status {c}"));
            let detail = combined.trim();
            return Err(failed(if detail.is_empty() {
                status
            } else {
                format!("{status}: {detail}")
            }));
        }
        Ok(combined)
    }
}
