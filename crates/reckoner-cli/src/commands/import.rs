//! Import command - describe an installed release as a course entry

use reckoner_kube::{HelmBinary, import_release};

use crate::error::Result;

/// Prints a one-item release list, ready to paste under `releases:`
pub async fn run(namespace: &str, release_name: &str, repository: &str) -> Result<()> {
    let release = import_release(&HelmBinary::new(), namespace, release_name, repository).await?;
    print!("{}", serde_yaml::to_string(&[release])?);
    Ok(())
}
