//! Template command - render releases locally

use std::path::Path;

use console::style;
use reckoner_kube::write_split;

use crate::SessionArgs;
use crate::error::Result;

pub async fn run(course: &Path, args: &SessionArgs, output_dir: Option<&Path>) -> Result<()> {
    let loaded = super::load(course).await?;
    let mut session = super::render_session(loaded, args).await?;
    let rendered = session.template().await?;

    match output_dir {
        Some(dir) => {
            for release in &rendered {
                let written = write_split(&release.manifest, dir, &release.name)?;
                for path in &written {
                    println!("{} {}", style("wrote").green(), path.display());
                }
            }
        }
        None => {
            for release in &rendered {
                println!("{}", release.manifest.trim_end());
            }
        }
    }

    super::finish(session.errors())
}
