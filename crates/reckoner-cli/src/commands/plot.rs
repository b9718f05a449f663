//! Plot command - install or upgrade releases

use std::path::Path;

use console::style;
use reckoner_kube::ReleaseStatus;

use crate::SessionArgs;
use crate::error::Result;

pub async fn run(course: &Path, args: &SessionArgs) -> Result<()> {
    let loaded = super::load(course).await?;
    let mut session = super::session(loaded, args).await?;

    let result = session.plot().await?;
    for outcome in &result.outcomes {
        if let ReleaseStatus::Deployed { output } = &outcome.status {
            if !output.is_empty() {
                println!("{output}");
            }
        }
    }

    let deployed = result.outcomes.iter().filter(|o| o.succeeded()).count();
    eprintln!(
        "{} {} of {} release(s) plotted",
        style("✓").green().bold(),
        deployed,
        result.outcomes.len()
    );
    super::finish(result.errors)
}
