//! Structural validation of resolved courses

use serde_json::Value as JsonValue;
use tracing::error;

use crate::course::Course;
use crate::error::{CoreError, Result, ValidationErrorInfo};

/// JSON schema (draft-07) for a fully resolved v2 course
pub const DEFAULT_COURSE_SCHEMA: &str = include_str!("../schema/course.schema.json");

/// Result of schema validation
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Compiled course schema
pub struct CourseSchema {
    compiled: jsonschema::Validator,
}

impl CourseSchema {
    /// Compile a schema from its JSON bytes
    pub fn new(schema: &[u8]) -> Result<Self> {
        let json: JsonValue = serde_json::from_slice(schema)?;
        let compiled = jsonschema::validator_for(&json).map_err(|e| CoreError::InvalidSchema {
            message: e.to_string(),
        })?;
        Ok(Self { compiled })
    }

    /// Compile the built-in course schema
    pub fn builtin() -> Result<Self> {
        Self::new(DEFAULT_COURSE_SCHEMA.as_bytes())
    }

    /// Validate a structural value
    pub fn validate(&self, instance: &JsonValue) -> ValidationResult {
        if self.compiled.is_valid(instance) {
            return ValidationResult::success();
        }

        let errors = self
            .compiled
            .iter_errors(instance)
            .map(|e| {
                let path = e.instance_path.to_string();
                ValidationErrorInfo {
                    path: if path.is_empty() { "(root)".to_string() } else { path },
                    message: e.to_string().replace('"', "'"),
                }
            })
            .collect();
        ValidationResult::failure(errors)
    }

    /// Validate a resolved course, failing with every violation found
    pub fn check(&self, course: &Course, file: &str) -> Result<()> {
        let result = self.validate(&course.to_json()?);
        if result.is_valid {
            return Ok(());
        }
        for violation in &result.errors {
            error!(file, "schema violation: {violation}");
        }
        Err(CoreError::SchemaValidation {
            file: file.to_string(),
            errors: result.errors,
        })
    }
}
