//! Configuration and input validation
//!
//! A fluent validator that collects every problem instead of stopping at the
//! first one. Used for lint reports and tool configuration checks.
//!
//! # Example
//!
//! ```rust
//! use droidbuild_core::validation::Validator;
//!
//! let result = Validator::new()
//!     .warn_if("multiDexEnabled", "REDUNDANT_MULTIDEX", true, "minSdk 21 has native multidex")
//!     .validate();
//!
//! assert!(result.is_valid());
//! assert_eq!(result.warnings().len(), 1);
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
    /// Expected value (if applicable)
    pub expected: Option<String>,
    /// Actual value (if applicable)
    pub actual: Option<String>,
}

impl ValidationError {
    /// Create an entry with no expected/actual detail
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
            expected: None,
            actual: None,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl From<&Error> for ValidationError {
    fn from(err: &Error) -> Self {
        Self {
            field: err.field.clone().unwrap_or_default(),
            message: err.message.clone(),
            code: format!("{:?}", err.code),
            expected: None,
            actual: None,
        }
    }
}

/// Validation result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get all warnings
    pub fn warnings(&self) -> &[ValidationError] {
        &self.warnings
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: ValidationError) {
        self.warnings.push(warning);
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Turn every warning into an error
    pub fn deny_warnings(mut self) -> Self {
        self.errors.append(&mut self.warnings);
        self
    }
}

/// Fluent validator builder
pub struct Validator {
    result: ValidationResult,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    /// Record a failed `Result` as an error
    pub fn check<T>(mut self, outcome: &Result<T>) -> Self {
        if let Err(err) = outcome {
            self.result.add_error(ValidationError::from(err));
        }
        self
    }

    /// Add a warning (non-blocking)
    pub fn warn_if(mut self, field: &str, code: &str, condition: bool, message: &str) -> Self {
        if condition {
            self.result.add_warning(ValidationError::new(field, code, message));
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> ValidationResult {
        self.result
    }
}

/// Check tool configuration for unknown top-level keys
pub fn validate_config_keys(config: &toml::Table) -> ValidationResult {
    let mut result = ValidationResult::new();

    let known_keys = ["toolchain", "plugins", "signing", "lint", "logging"];

    for key in config.keys() {
        if !known_keys.contains(&key.as_str()) {
            result.add_warning(ValidationError {
                field: key.clone(),
                message: format!("Unknown configuration key: {}", key),
                code: "UNKNOWN_KEY".to_string(),
                expected: Some(known_keys.join(", ")),
                actual: Some(key.clone()),
            });
        }
    }

    result
}
