//! Structured error handling with codes, field, and recovery suggestions
//!
//! Every error carries:
//! - An error code for programmatic handling
//! - The offending descriptor field, when there is one
//! - Optional context and a recovery suggestion
//! - A serializable report form for `--json` output

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ErrorCode {
    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,

    // Configuration errors (3xxx)
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    InvalidConfigValue = 3003,

    // Build descriptor errors (4xxx)
    MalformedConfig = 4001,
    InvalidVersionConstraint = 4002,
    UnknownSigningConfig = 4003,
    DuplicateDependency = 4004,
    UnresolvedPlugin = 4005,

    // Process errors (5xxx)
    ProcessError = 5000,
    CommandNotFound = 5001,

    // Platform-specific errors (8xxx)
    GradleError = 8002,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            2 => "IO",
            3 => "Configuration",
            4 => "Descriptor",
            5 => "Process",
            8 => "Platform",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Offending field, as a dotted path (e.g. `android.defaultConfig.minSdk`)
    pub field: Option<String>,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(field) = &self.field {
            write!(f, "\n  Field: {}", field)?;
        }
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Attach the offending field
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Process exit code matching this error's category
    pub fn exit_code(&self) -> i32 {
        match self.code.code() / 1000 {
            3 => exit_codes::CONFIG_ERROR,
            4 => exit_codes::VALIDATION_ERROR,
            _ if self.code == ErrorCode::CommandNotFound => exit_codes::COMMAND_NOT_FOUND,
            _ => exit_codes::FAILURE,
        }
    }

    /// Convert to a serializable report
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            field: self.field.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    // Convenience constructors

    /// Missing input file
    pub fn file_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Check that the file exists and you have read permissions")
    }

    /// Explicitly requested tool configuration file is missing
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a .droidbuild.toml file or omit --config to use defaults")
    }

    /// Descriptor text is syntactically wrong or misses a required section
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedConfig, message).with_field(field)
    }

    /// Version ordering or compatibility constraint violated
    pub fn invalid_version_constraint(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidVersionConstraint, message).with_field(field)
    }

    /// Signing config reference with no table entry
    pub fn unknown_signing_config(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownSigningConfig,
            format!("Unknown signing config: {}", name),
        )
        .with_field("android.buildTypes.signingConfig")
        .with_suggestion(format!(
            "Define [signing.{}] in .droidbuild.toml or reference an existing config",
            name
        ))
    }

    /// Two declarations share a (group, artifact) pair
    pub fn duplicate_dependency(group: &str, artifact: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateDependency,
            format!("Duplicate dependency: {}:{}", group, artifact),
        )
        .with_field("dependencies")
        .with_suggestion("Keep a single declaration per group:artifact")
    }

    /// Plugin id unknown or applied in an invalid position
    pub fn unresolved_plugin(id: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnresolvedPlugin, message)
            .with_field(format!("plugins.{}", id))
    }

    /// Child process could not be run
    pub fn process(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProcessError, message)
    }

    /// Executable missing from PATH
    pub fn command_not_found(cmd: &str) -> Self {
        Self::new(
            ErrorCode::CommandNotFound,
            format!("Command not found: {}", cmd),
        )
        .with_suggestion(format!("Install {} and ensure it's in your PATH", cmd))
    }
}

/// Serializable error report for logging and JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
#[allow(missing_docs)]
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const COMMAND_NOT_FOUND: i32 = 127;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Attach context to the error, if any
    fn context(self, context: impl Into<String>) -> Result<T>;
    /// Attach a suggestion to the error, if any
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}
