//! Lint command - validate a course file

use std::path::Path;

use console::style;

use crate::error::Result;

pub async fn run(course: &Path) -> Result<()> {
    let loaded = super::load(course).await?;

    if loaded.converted {
        println!(
            "{} {} uses the v1 schema, run `reckoner convert --in-place {}`",
            style("⚠").yellow(),
            course.display(),
            course.display()
        );
    }
    println!(
        "{} {} is valid ({} release(s))",
        style("✓").green().bold(),
        course.display(),
        loaded.course.releases.len()
    );
    Ok(())
}
