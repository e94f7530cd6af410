//! Core utilities for droidbuild
//!
//! This crate provides shared functionality used by the descriptor toolkit and the CLI:
//!
//! - **Error handling**: Structured errors with codes, offending field, context, and suggestions
//! - **Configuration**: TOML-based tool configuration with discovery and defaults
//! - **Validation**: Fluent validator collecting errors and warnings
//! - **Process execution**: Command execution with captured output
//!
//! # Example
//!
//! ```rust,no_run
//! use droidbuild_core::config::Config;
//!
//! let config = Config::load(None).expect("Invalid configuration");
//! println!("max JVM target: {}", config.schema.toolchain.max_jvm_target);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod process;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::validation::{ValidationError, ValidationResult, Validator};
}
