//! Core error types

use thiserror::Error;

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// JSON pointer into the course (e.g. `/releases/0/name`)
    pub path: String,

    /// Human readable message
    pub message: String,
}

impl std::fmt::Display for ValidationErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Course file not found: {path}")]
    CourseNotFound { path: String },

    #[error("Failed to parse course YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Malformed YAML in {file}: {message}")]
    Yaml { file: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Course {file} references environment variables that are not set: {}", .variables.join(", "))]
    EnvNotSet { file: String, variables: Vec<String> },

    #[error("Unsupported schema version: {version}")]
    UnsupportedSchema { version: String },

    #[error("Could not read course file from v1 or v2 schema:\n\t{primary}\n\t{fallback}")]
    Migration { primary: String, fallback: String },

    #[error("Course file {file} has {} schema validation error(s)", .errors.len())]
    SchemaValidation {
        file: String,
        errors: Vec<ValidationErrorInfo>,
    },

    #[error("Invalid course schema: {message}")]
    InvalidSchema { message: String },

    #[error("{tool} version {found} does not satisfy minimum version {required}")]
    VersionConstraint {
        tool: String,
        required: String,
        found: String,
    },

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("No valid releases found in course file")]
    NoReleases,

    #[error("No valid releases found in course that match input releases: {}", .requested.join(", "))]
    NoMatchingReleases { requested: Vec<String> },

    #[error("Cannot set checkout path on release {release} - it is already set to {path}")]
    CheckoutAlreadySet { release: String, path: String },
}

impl CoreError {
    /// Schema violations, if this is a schema validation failure
    pub fn validation_errors(&self) -> &[ValidationErrorInfo] {
        match self {
            CoreError::SchemaValidation { errors, .. } => errors,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
