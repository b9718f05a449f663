//! Minimum version constraints

use semver::{Version, VersionReq};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Version string reported by development builds; never constrained
pub const DEVELOPMENT_VERSION: &str = "0.0.0";

/// Parse a version as reported by a tool, tolerating a leading `v`
pub fn parse_version(raw: &str) -> Result<Version> {
    Ok(Version::parse(raw.trim().trim_start_matches('v'))?)
}

fn satisfies(tool: &str, minimum: &str, current: &Version) -> Result<()> {
    let minimum = minimum.trim().trim_start_matches('v');
    let constraint = VersionReq::parse(&format!(">={minimum}"))?;
    debug!(tool, %constraint, %current, "checking minimum version");

    if constraint.matches(current) {
        Ok(())
    } else {
        Err(CoreError::VersionConstraint {
            tool: tool.to_string(),
            required: minimum.to_string(),
            found: current.to_string(),
        })
    }
}

/// Check the installed helm version against the course minimum
pub fn check_helm(minimum: Option<&str>, installed: &str) -> Result<()> {
    let Some(minimum) = minimum else {
        debug!("no minimum helm version, assuming okay");
        return Ok(());
    };
    satisfies("helm", minimum, &parse_version(installed)?)
}

/// Check this tool's version against the course minimum
pub fn check_reckoner(minimum: Option<&str>, running: &str) -> Result<()> {
    let Some(minimum) = minimum else {
        debug!("no minimum reckoner version, assuming okay");
        return Ok(());
    };
    if running == DEVELOPMENT_VERSION {
        debug!("development build, skipping reckoner version check");
        return Ok(());
    }
    satisfies("reckoner", minimum, &parse_version(running)?)
}
