//! Diff engine for comparing live release manifests with rendered templates
//!
//! Documents are matched by kind, name and template source. A rendered
//! document with no live counterpart is diffed against nothing, so its whole
//! content shows up as added.

use std::fmt;

use similar::{ChangeTag, TextDiff};

use crate::error::Result;
use crate::manifest::{ManifestDocument, parse_documents};

/// Marker appended to the header of resources that are not installed yet
pub const NEW_RESOURCE_MARKER: &str = " does not exist and will be added\n";

/// Diff engine for release comparison
pub struct DiffEngine {
    /// Unchanged lines shown before and after each change
    pub context_lines: usize,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self { context_lines: 4 }
    }

    /// Set the number of context lines
    pub fn with_context(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Line diff of two texts; empty when they are identical
    ///
    /// Removed lines start with `-`, added lines with `+` and context lines
    /// with a space. Separate hunks are divided by an empty line.
    pub fn diff_text(&self, old: &str, new: &str) -> String {
        if old == new {
            return String::new();
        }

        let diff = TextDiff::from_lines(old, new);
        let mut output = String::new();
        let groups = diff.grouped_ops(self.context_lines);

        for (idx, group) in groups.iter().enumerate() {
            if idx > 0 {
                output.push('\n');
            }
            for op in group {
                for change in diff.iter_changes(op) {
                    let prefix = match change.tag() {
                        ChangeTag::Delete => "-",
                        ChangeTag::Insert => "+",
                        ChangeTag::Equal => " ",
                    };
                    output.push_str(prefix);
                    output.push_str(change.value().trim_end_matches(['\n', '\r']));
                    output.push('\n');
                }
            }
        }
        output
    }

    /// Diff every desired document against its live counterpart
    ///
    /// Documents without differences are left out.
    pub fn diff_documents(
        &self,
        release: &str,
        live: &[ManifestDocument],
        desired: &[ManifestDocument],
    ) -> Vec<ManifestDiff> {
        desired
            .iter()
            .filter_map(|doc| {
                let existing = live.iter().find(|l| l.same_resource(doc));
                let old = existing.map_or("", |l| l.content.as_str());
                let diff = self.diff_text(old, &doc.content);
                (!diff.is_empty()).then(|| ManifestDiff {
                    release: release.to_string(),
                    kind: doc.kind.clone(),
                    name: doc.name.clone(),
                    source: doc.source.clone(),
                    diff,
                    new_file: existing.is_none(),
                })
            })
            .collect()
    }

    /// Diff the live manifest of a release against its rendered template
    pub fn diff_release(&self, release: &str, live: &str, desired: &str) -> Result<Vec<ManifestDiff>> {
        let live = parse_documents(live)?;
        let desired = parse_documents(desired)?;
        Ok(self.diff_documents(release, &live, &desired))
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Difference for a single resource of a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDiff {
    pub release: String,
    pub kind: String,
    pub name: String,
    pub source: String,
    pub diff: String,
    /// The resource is not installed yet
    pub new_file: bool,
}

impl fmt::Display for ManifestDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.diff.is_empty() {
            return Ok(());
        }
        let marker = if self.new_file { NEW_RESOURCE_MARKER } else { "" };
        write!(f, "\n{} \"{}\"{}\n{}", self.kind, self.name, marker, self.diff)
    }
}

/// All differences found for one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDiff {
    pub release: String,
    pub namespace: String,
    pub changes: Vec<ManifestDiff>,
}

impl ReleaseDiff {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

impl fmt::Display for ReleaseDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.changes {
            write!(f, "{change}")?;
        }
        Ok(())
    }
}
