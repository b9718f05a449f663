//! Reckoner Core - course model and resolution for the helm release manager
//!
//! This crate turns a course file into a fully resolved set of releases:
//! - `yaml` / `env`: interpolation of environment variables and retyping of plain scalars
//! - `legacy`: the v1 schema and its migration to v2
//! - `defaults`: namespace, repository, chart and namespace policy inheritance
//! - `schema`: structural validation
//! - `selection`: narrowing to the requested releases and git checkout paths
//! - `version`: minimum helm and reckoner versions

pub mod course;
pub mod defaults;
pub mod env;
pub mod error;
pub mod legacy;
pub mod loader;
mod scalar;
pub mod schema;
pub mod selection;
pub mod values;
pub mod version;
pub mod yaml;

pub use course::{
    CURRENT_SCHEMA, Course, GitCheckout, GitOps, Hooks, MinimumVersions, NamespaceConfig,
    NamespaceManagement, NamespaceMetadata, NamespaceSettings, Release, Repository, SecretSpec,
};
pub use env::Variables;
pub use error::{CoreError, Result, ValidationErrorInfo};
pub use legacy::{LegacyCourse, LegacyRepository};
pub use loader::{CourseLoader, LoadedCourse, ParsedCourse, convert_file, secret_specs};
pub use schema::{CourseSchema, DEFAULT_COURSE_SCHEMA, ValidationResult};
pub use selection::Selection;
pub use values::Values;
