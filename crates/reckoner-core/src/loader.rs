//! Course loading pipeline
//!
//! Reading a course runs, in order: interpolation and retyping of scalars,
//! decoding into the current or legacy shape, migration, defaulting, a schema
//! version check and structural validation. Nothing is written back to disk.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::course::{CURRENT_SCHEMA, Course, SecretSpec};
use crate::defaults;
use crate::env::Variables;
use crate::error::{CoreError, Result};
use crate::legacy::LegacyCourse;
use crate::schema::CourseSchema;
use crate::yaml::{self, LoadError};

/// A course decoded at the parse boundary
#[derive(Debug, Clone)]
pub enum ParsedCourse {
    Current(Course),
    Legacy(LegacyCourse),
}

impl ParsedCourse {
    /// Decode a document, falling back to the legacy shape when the schema
    /// tag is not the current generation
    pub fn from_value(value: Value) -> Result<Self> {
        let tag = value
            .get("schema")
            .and_then(Value::as_str)
            .map(str::to_string);

        match serde_yaml::from_value::<Course>(value.clone()) {
            Ok(course) if tag.as_deref() == Some(CURRENT_SCHEMA) => Ok(ParsedCourse::Current(course)),
            Err(e) if tag.as_deref() == Some(CURRENT_SCHEMA) => Err(CoreError::YamlParse(e)),
            current => {
                debug!(schema = ?tag, "did not detect a v2 course, trying v1");
                let primary = match current {
                    Ok(_) => format!("schema tag is {:?}, expected {CURRENT_SCHEMA}", tag.unwrap_or_default()),
                    Err(e) => e.to_string(),
                };
                serde_yaml::from_value::<LegacyCourse>(value)
                    .map(ParsedCourse::Legacy)
                    .map_err(|fallback| CoreError::Migration {
                        primary,
                        fallback: fallback.to_string(),
                    })
            }
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ParsedCourse::Legacy(_))
    }

    /// Resolve into the canonical shape
    pub fn into_current(self) -> Course {
        match self {
            ParsedCourse::Current(course) => course,
            ParsedCourse::Legacy(legacy) => legacy.migrate(),
        }
    }
}

/// A fully resolved course and where it came from
#[derive(Debug, Clone)]
pub struct LoadedCourse {
    pub course: Course,
    pub path: PathBuf,
    /// The file is in the legacy schema and was migrated in memory
    pub converted: bool,
}

impl LoadedCourse {
    /// Directory hooks run in and values files are resolved against
    pub fn base_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

/// Loads course files against a structural schema
pub struct CourseLoader {
    schema: CourseSchema,
    variables: Variables,
}

impl CourseLoader {
    /// Create a loader that validates against `schema` (JSON bytes)
    pub fn new(schema: &[u8]) -> Result<Self> {
        Ok(Self {
            schema: CourseSchema::new(schema)?,
            variables: Variables::from_env(),
        })
    }

    /// Replace the variables used for interpolation
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Read and resolve a course file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<LoadedCourse> {
        let path = path.as_ref();
        let source = read_course(path)?;
        let (course, converted) = self.load_str(&source, &path.display().to_string())?;
        Ok(LoadedCourse {
            course,
            path: path.to_path_buf(),
            converted,
        })
    }

    /// Resolve course source text; `file` is used in messages only
    pub fn load_str(&self, source: &str, file: &str) -> Result<(Course, bool)> {
        let value = yaml::parse_interpolated(source, &self.variables).map_err(|e| match e {
            LoadError::Syntax(message) => CoreError::Yaml {
                file: file.to_string(),
                message,
            },
            LoadError::Unresolved(variables) => CoreError::EnvNotSet {
                file: file.to_string(),
                variables,
            },
        })?;

        let parsed = ParsedCourse::from_value(value)?;
        let converted = parsed.is_legacy();
        if converted {
            warn!(file, "course was converted from v1 to v2 at runtime");
        }

        let course = defaults::apply(parsed.into_current());

        match course.schema.as_deref() {
            Some(CURRENT_SCHEMA) => {}
            other => {
                return Err(CoreError::UnsupportedSchema {
                    version: other.unwrap_or_default().to_string(),
                });
            }
        }

        self.schema.check(&course, file)?;
        Ok((course, converted))
    }
}

fn read_course(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(CoreError::CourseNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

#[derive(Deserialize)]
struct SecretsBlock {
    #[serde(default)]
    secrets: Vec<SecretSpec>,
}

/// Read only the `secrets` block, without interpolation
///
/// Secrets are resolved before the rest of the course is interpolated, so
/// their specs cannot depend on variables themselves.
pub fn secret_specs(path: impl AsRef<Path>) -> Result<Vec<SecretSpec>> {
    let block: SecretsBlock = serde_yaml::from_value(read_plain(path.as_ref())?)?;
    Ok(block.secrets)
}

/// Migrate a course file to the current schema without resolving it
///
/// Variable references are kept verbatim and no defaults are filled in, so
/// the result can be written back in place of the original.
pub fn convert_file(path: impl AsRef<Path>) -> Result<Course> {
    let value = read_plain(path.as_ref())?;
    Ok(ParsedCourse::from_value(value)?.into_current())
}

fn read_plain(path: &Path) -> Result<Value> {
    let source = read_course(path)?;
    yaml::parse_plain(&source).map_err(|e| CoreError::Yaml {
        file: path.display().to_string(),
        message: match e {
            LoadError::Syntax(message) => message,
            LoadError::Unresolved(names) => format!("unresolved variables: {}", names.join(", ")),
        },
    })
}
