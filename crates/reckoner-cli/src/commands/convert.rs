//! Convert command - rewrite a v1 course in the current schema

use std::path::Path;

use console::style;
use reckoner_core::convert_file;

use crate::error::Result;

pub fn run(course: &Path, in_place: bool) -> Result<()> {
    let converted = convert_file(course)?.to_yaml()?;

    if in_place {
        std::fs::write(course, &converted)?;
        eprintln!(
            "{} converted {}",
            style("✓").green().bold(),
            course.display()
        );
    } else {
        print!("{converted}");
    }
    Ok(())
}
