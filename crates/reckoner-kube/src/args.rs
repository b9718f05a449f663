//! helm argument construction
//!
//! The order of the arguments matters to helm: values files are merged left
//! to right, so the inline values come first and the declared files override
//! them in order.

use std::io::Write;
use std::path::Path;

use reckoner_core::Release;
use tempfile::NamedTempFile;

use crate::error::Result;

/// What the invocation does with the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelmAction {
    /// `helm upgrade --install`
    Upgrade,
    /// `helm template`
    Template,
}

impl HelmAction {
    fn prefix(self) -> &'static [&'static str] {
        match self {
            HelmAction::Upgrade => &["upgrade", "--install"],
            HelmAction::Template => &["template"],
        }
    }
}

/// A ready-to-run helm command line
///
/// Holds the transient values file, if any; the file is removed when the
/// invocation is dropped.
#[derive(Debug)]
pub struct HelmInvocation {
    args: Vec<String>,
    values_file: Option<NamedTempFile>,
}

impl HelmInvocation {
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Append further arguments, e.g. `--dry-run`
    pub fn push(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Location of the transient values file
    pub fn values_path(&self) -> Option<&Path> {
        self.values_file.as_ref().map(|f| f.path())
    }
}

/// Build the helm arguments for one release
///
/// `extra_args` are passed through right after the action. Values files
/// declared by the release are resolved against `base_dir`.
pub fn build_helm_args(
    action: HelmAction,
    release: &Release,
    base_dir: &Path,
    extra_args: &[String],
) -> Result<HelmInvocation> {
    let mut args: Vec<String> = action.prefix().iter().map(|a| a.to_string()).collect();
    args.extend(extra_args.iter().cloned());
    args.push(release.name.clone());

    match release.checkout() {
        Some(checkout) => args.push(checkout.chart_dir().display().to_string()),
        None => args.push(format!("{}/{}", release.repository(), release.chart())),
    }

    let values_file = match &release.values {
        Some(values) => {
            let file = write_values_file(&values.to_yaml()?)?;
            args.push(format!("--values={}", file.path().display()));
            Some(file)
        }
        None => None,
    };

    for file in &release.files {
        args.push(format!("--values={}", base_dir.join(file).display()));
    }

    args.push(format!("--namespace={}", release.namespace()));

    if let Some(version) = release.version.as_deref() {
        if release.checkout().is_none() {
            args.push(format!("--version={version}"));
        }
    }

    Ok(HelmInvocation { args, values_file })
}

fn write_values_file(yaml: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("reckoner-")
        .suffix(".yaml")
        .tempfile()?;
    file.write_all(yaml.as_bytes())?;
    file.flush()?;
    Ok(file)
}
