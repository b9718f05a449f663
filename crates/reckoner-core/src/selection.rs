//! Release selection and git checkout assignment

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::course::{GitCheckout, Release, Repository};
use crate::error::{CoreError, Result};

static URL_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"://|/|\.").expect("valid regex"));

/// Which releases a session operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(Vec<String>),
}

impl Selection {
    /// Build from CLI input: `--run-all` or an explicit list of names
    pub fn from_args(run_all: bool, only: Vec<String>) -> Self {
        if run_all || only.is_empty() {
            Selection::All
        } else {
            Selection::Only(only)
        }
    }

    pub fn includes(&self, name: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Narrow releases to the selection, keeping course order
///
/// Requested names that are not in the course are dropped; only an empty
/// result is an error.
pub fn select(releases: Vec<Release>, selection: &Selection) -> Result<Vec<Release>> {
    if let Selection::Only(names) = selection {
        for name in names {
            if !releases.iter().any(|r| &r.name == name) {
                warn!(release = %name, "requested release is not in the course, ignoring");
            }
        }
    }

    let selected: Vec<Release> = releases
        .into_iter()
        .filter(|r| selection.includes(&r.name))
        .collect();

    if selected.is_empty() {
        return Err(match selection {
            Selection::All => CoreError::NoReleases,
            Selection::Only(names) => CoreError::NoMatchingReleases {
                requested: names.clone(),
            },
        });
    }
    Ok(selected)
}

/// Directory name a git repository is cloned into under the helm cache
pub fn checkout_dir_name(git_url: &str) -> String {
    format!("{}_goreckoner", URL_SEPARATORS.replace_all(git_url, "_"))
}

/// Attach checkout locations to releases whose repository is a git repository
pub fn assign_checkouts(
    releases: Vec<Release>,
    repositories: &IndexMap<String, Repository>,
    cache_dir: &Path,
) -> Result<Vec<Release>> {
    releases
        .into_iter()
        .map(|release| {
            let Some(repo) = repositories.get(release.repository()) else {
                return Ok(release);
            };
            let Some(git) = repo.git.as_deref() else {
                return Ok(release);
            };

            let clone_path = cache_dir.join(checkout_dir_name(git));
            let chart_path = match repo.path.as_deref() {
                Some(sub) => PathBuf::from(sub).join(release.chart()),
                None => PathBuf::from(release.chart()),
            };
            debug!(release = %release.name, path = %clone_path.display(), "assigned git checkout");
            release.with_checkout(GitCheckout {
                clone_path,
                chart_path,
            })
        })
        .collect()
}
