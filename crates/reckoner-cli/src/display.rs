//! Terminal rendering helpers

use console::style;

/// Color added lines green and removed lines red
pub fn colorize_diff(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.starts_with('+') {
                style(line).green().to_string()
            } else if line.starts_with('-') {
                style(line).red().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
