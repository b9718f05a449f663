//! Update command - plot only what changed

use std::path::Path;

use console::style;

use crate::SessionArgs;
use crate::display::colorize_diff;
use crate::error::Result;

pub async fn run(course: &Path, args: &SessionArgs) -> Result<()> {
    let loaded = super::load(course).await?;
    let mut session = super::session(loaded, args).await?;

    let result = session.update().await?;
    for diff in result.diffs.iter().filter(|d| d.has_changes()) {
        println!("{}", colorize_diff(&diff.to_string()));
    }

    if result.plot.outcomes.is_empty() {
        eprintln!("{}", style("Nothing to update").green());
    } else {
        let plotted = result.plot.outcomes.iter().filter(|o| o.succeeded()).count();
        eprintln!(
            "{} {} release(s) updated",
            style("✓").green().bold(),
            plotted
        );
    }
    super::finish(session.errors())
}
