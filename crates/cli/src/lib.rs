//! Terminal output helpers for droidbuild
//!
//! - Status lines (success, error, warning, info)
//! - Validation report rendering
//! - Count formatting

#![warn(missing_docs)]

pub mod output;
