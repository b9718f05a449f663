//! Diff command - compare rendered templates with installed releases

use std::path::Path;

use crate::SessionArgs;
use crate::display::colorize_diff;
use crate::error::Result;

pub async fn run(course: &Path, args: &SessionArgs) -> Result<()> {
    let loaded = super::load(course).await?;
    let mut session = super::render_session(loaded, args).await?;

    for diff in session.diff().await? {
        if diff.has_changes() {
            println!("{}", colorize_diff(&diff.to_string()));
        }
    }
    super::finish(session.errors())
}
