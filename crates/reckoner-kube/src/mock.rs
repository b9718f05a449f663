//! In-memory collaborators for tests
//!
//! Each mock records what it was asked to do so tests can assert on calls
//! without helm, git or a cluster.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::cluster::{ClusterClient, NamespaceState};
use crate::error::{KubeError, Result};
use crate::git::GitClient;
use crate::helm::{HelmClient, HelmOutput};
use crate::hooks::{HookPhase, HookRunner};

#[derive(Debug, Default)]
struct HelmState {
    calls: Vec<Vec<String>>,
    version: String,
    cache_dir: String,
    /// (namespace, release) -> manifest
    manifests: HashMap<(String, String), String>,
    /// (namespace, release) -> user values YAML
    user_values: HashMap<(String, String), String>,
    /// namespace -> `helm list` YAML
    release_lists: HashMap<String, String>,
    /// release -> `helm template` output
    templates: HashMap<String, String>,
    failing: HashSet<String>,
    values_files: Vec<String>,
}

/// helm stand-in answering from canned output
#[derive(Clone)]
pub struct MockHelm {
    state: Arc<Mutex<HelmState>>,
}

impl MockHelm {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HelmState {
                version: "v3.14.0".to_string(),
                cache_dir: "/helm/cache".to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn with_version(self, version: &str) -> Self {
        self.state.lock().unwrap().version = version.to_string();
        self
    }

    pub fn with_cache_dir(self, dir: &str) -> Self {
        self.state.lock().unwrap().cache_dir = dir.to_string();
        self
    }

    pub fn with_manifest(self, namespace: &str, release: &str, manifest: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .manifests
            .insert((namespace.to_string(), release.to_string()), manifest.to_string());
        self
    }

    pub fn with_user_values(self, namespace: &str, release: &str, values: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .user_values
            .insert((namespace.to_string(), release.to_string()), values.to_string());
        self
    }

    pub fn with_release_list(self, namespace: &str, list: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .release_lists
            .insert(namespace.to_string(), list.to_string());
        self
    }

    pub fn with_template(self, release: &str, rendered: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .templates
            .insert(release.to_string(), rendered.to_string());
        self
    }

    /// `upgrade` and `template` of this release exit non-zero
    pub fn failing_release(self, release: &str) -> Self {
        self.state.lock().unwrap().failing.insert(release.to_string());
        self
    }

    /// Every argument list helm was run with, in order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Contents of the transient values files seen by `upgrade` and `template`
    pub fn values_files(&self) -> Vec<String> {
        self.state.lock().unwrap().values_files.clone()
    }
}

impl Default for MockHelm {
    fn default() -> Self {
        Self::new()
    }
}

fn helm_failure(command: &str, stderr: &str) -> KubeError {
    KubeError::HelmCommand {
        command: command.to_string(),
        code: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

fn not_found(command: &str) -> KubeError {
    helm_failure(command, "Error: release: not found\n")
}

fn stdout(text: impl Into<String>) -> Result<HelmOutput> {
    Ok(HelmOutput {
        stdout: text.into(),
        stderr: String::new(),
    })
}

#[async_trait]
impl HelmClient for MockHelm {
    async fn exec(&self, args: &[String]) -> Result<HelmOutput> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(args.to_vec());

        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();
        match arg(0) {
            "version" => stdout(state.version.clone()),
            "env" => stdout(format!("{}\n", state.cache_dir)),
            "get" => {
                let key = (arg(4).to_string(), arg(2).to_string());
                let found = match arg(1) {
                    "manifest" => state.manifests.get(&key),
                    _ => state.user_values.get(&key),
                };
                match found {
                    Some(text) => stdout(text.clone()),
                    None => Err(not_found("get")),
                }
            }
            "list" => stdout(state.release_lists.get(arg(2)).cloned().unwrap_or_default()),
            action @ ("upgrade" | "template") => {
                let release = args[1..]
                    .iter()
                    .find(|a| !a.starts_with('-'))
                    .cloned()
                    .unwrap_or_default();

                for value in args.iter().filter_map(|a| a.strip_prefix("--values=")) {
                    let path = Path::new(value);
                    let transient = path
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with("reckoner-"));
                    if transient {
                        let content = std::fs::read_to_string(path)?;
                        state.values_files.push(content);
                    }
                }

                if state.failing.contains(&release) {
                    return Err(helm_failure(action, "Error: chart failed to render"));
                }
                if action == "template" {
                    stdout(state.templates.get(&release).cloned().unwrap_or_default())
                } else {
                    stdout(format!("Release \"{release}\" has been upgraded.\n"))
                }
            }
            _ => stdout(""),
        }
    }
}

/// git stand-in recording checkouts
#[derive(Clone, Default)]
pub struct MockGit {
    checkouts: Arc<Mutex<Vec<(String, PathBuf, String)>>>,
    failing: bool,
    unwritable: bool,
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every checkout fails
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Every checkout fails to write its clone directory
    pub fn unwritable(mut self) -> Self {
        self.unwritable = true;
        self
    }

    /// (url, path, reference) of every checkout
    pub fn checkouts(&self) -> Vec<(String, PathBuf, String)> {
        self.checkouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GitClient for MockGit {
    async fn checkout(&self, url: &str, path: &Path, reference: &str) -> Result<()> {
        self.checkouts
            .lock()
            .unwrap()
            .push((url.to_string(), path.to_path_buf(), reference.to_string()));
        if self.unwritable {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("cannot create {}", path.display()),
            )
            .into());
        }
        if self.failing {
            return Err(KubeError::Git {
                repository: url.to_string(),
                message: "could not read from remote repository".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    Create {
        name: String,
        annotations: BTreeMap<String, String>,
        labels: BTreeMap<String, String>,
    },
    Patch {
        name: String,
        annotations: BTreeMap<String, String>,
        labels: BTreeMap<String, String>,
    },
}

/// Cluster stand-in holding namespaces in memory
#[derive(Clone, Default)]
pub struct MockCluster {
    namespaces: Arc<Mutex<Vec<NamespaceState>>>,
    calls: Arc<Mutex<Vec<ClusterCall>>>,
    failing: bool,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(self, name: &str, labels: &[(&str, &str)]) -> Self {
        self.namespaces.lock().unwrap().push(NamespaceState {
            name: name.to_string(),
            annotations: BTreeMap::new(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    /// Creating and patching fail
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> Vec<ClusterCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of the namespaces created, in order
    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClusterCall::Create { name, .. } => Some(name),
                ClusterCall::Patch { .. } => None,
            })
            .collect()
    }

    fn refuse(&self, name: &str) -> Result<()> {
        if self.failing {
            return Err(KubeError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("namespaces \"{name}\" is forbidden"),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceState>> {
        Ok(self.namespaces.lock().unwrap().clone())
    }

    async fn create_namespace(
        &self,
        name: &str,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.refuse(name)?;
        self.calls.lock().unwrap().push(ClusterCall::Create {
            name: name.to_string(),
            annotations: annotations.clone(),
            labels: labels.clone(),
        });
        self.namespaces.lock().unwrap().push(NamespaceState {
            name: name.to_string(),
            annotations: annotations.clone(),
            labels: labels.clone(),
        });
        Ok(())
    }

    async fn patch_namespace(
        &self,
        name: &str,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.refuse(name)?;
        self.calls.lock().unwrap().push(ClusterCall::Patch {
            name: name.to_string(),
            annotations: annotations.clone(),
            labels: labels.clone(),
        });
        Ok(())
    }
}

/// Hook runner recording commands; listed commands fail
#[derive(Clone, Default)]
pub struct MockHookRunner {
    runs: Arc<Mutex<Vec<(String, PathBuf)>>>,
    failing: HashSet<String>,
}

impl MockHookRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, command: &str) -> Self {
        self.failing.insert(command.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.runs.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        self.runs.lock().unwrap().iter().map(|(_, d)| d.clone()).collect()
    }
}

#[async_trait]
impl HookRunner for MockHookRunner {
    async fn run(&self, phase: HookPhase, command: &str, dir: &Path) -> Result<String> {
        self.runs
            .lock()
            .unwrap()
            .push((command.to_string(), dir.to_path_buf()));
        if self.failing.contains(command) {
            return Err(KubeError::HookFailed {
                phase: phase.to_string(),
                command: command.to_string(),
                message: "exit status 1".to_string(),
            });
        }
        Ok(String::new())
    }
}
