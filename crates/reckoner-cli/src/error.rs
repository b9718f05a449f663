//! CLI error types with exit code handling
//!
//! Library errors are folded into a single CLI error that knows its exit
//! code and, where useful, a hint for the user.

use miette::Diagnostic;
use reckoner_core::CoreError;
use reckoner_kube::KubeError;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// The course could not be read, migrated or validated
    #[error("{message}")]
    #[diagnostic(code(reckoner::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A minimum version requirement is not met
    #[error("{message}")]
    #[diagnostic(
        code(reckoner::cli::version),
        help("upgrade the tool or lower minimum_versions in the course")
    )]
    Version { message: String },

    /// No release left after selection
    #[error("{message}")]
    #[diagnostic(code(reckoner::cli::selection))]
    Selection {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(reckoner::cli::io))]
    Io { message: String },

    /// Releases failed while continuing on error
    #[error("{count} error(s) occurred while processing releases")]
    #[diagnostic(code(reckoner::cli::releases))]
    ReleaseFailures { count: usize },

    /// Anything else, with the formatted message
    #[error("{message}")]
    #[diagnostic(code(reckoner::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Version { .. } => exit_codes::VERSION_ERROR,
            CliError::Selection { .. } => exit_codes::SELECTION_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::ReleaseFailures { .. } => exit_codes::RELEASE_FAILURES,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::CourseNotFound { .. } | CoreError::Io(_) => CliError::Io { message },
            CoreError::EnvNotSet { .. } => CliError::Validation {
                message,
                help: Some("export the variables, or escape a literal $ as $$".to_string()),
            },
            CoreError::UnsupportedSchema { .. } | CoreError::Migration { .. } => {
                CliError::Validation {
                    message,
                    help: Some("run `reckoner convert --in-place` on the course".to_string()),
                }
            }
            CoreError::SchemaValidation { errors, .. } => CliError::Validation {
                message,
                help: Some(
                    errors
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
            },
            CoreError::YamlParse(_)
            | CoreError::Yaml { .. }
            | CoreError::JsonParse(_)
            | CoreError::InvalidSchema { .. } => CliError::Validation {
                message,
                help: None,
            },
            CoreError::VersionConstraint { .. } | CoreError::InvalidVersion(_) => {
                CliError::Version { message }
            }
            CoreError::NoReleases | CoreError::NoMatchingReleases { .. } => CliError::Selection {
                message,
                help: Some("check the names given to --only against the course".to_string()),
            },
            CoreError::CheckoutAlreadySet { .. } => CliError::other(message),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::Io(e) => e.into(),
            other => CliError::other(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::other(err.to_string())
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
