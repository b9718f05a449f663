//! Get-manifests command

use std::path::Path;

use crate::SelectionArgs;
use crate::error::Result;

pub async fn run(course: &Path, selection: &SelectionArgs) -> Result<()> {
    let loaded = super::load(course).await?;
    let session = super::read_only_session(loaded, selection).await?;

    let manifests = session.get_manifests().await?;
    if !manifests.is_empty() {
        println!("{manifests}");
    }
    Ok(())
}
