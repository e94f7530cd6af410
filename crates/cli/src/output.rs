//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use droidbuild_core::validation::{ValidationError, ValidationResult};
use owo_colors::OwoColorize;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Render one validation entry as a single line
pub fn format_entry(entry: &ValidationError) -> String {
    match (&entry.expected, &entry.actual) {
        (Some(expected), Some(actual)) => format!(
            "{} [{}] (expected {}, found {})",
            entry, entry.code, expected, actual
        ),
        _ => format!("{} [{}]", entry, entry.code),
    }
}

/// Print every error and warning of a report, then a summary line
pub fn print_report(result: &ValidationResult) {
    for error in result.errors() {
        Status::error(&format_entry(error));
    }
    for warning in result.warnings() {
        Status::warning(&format_entry(warning));
    }

    let summary = format!(
        "{}, {}",
        format_count(result.errors().len(), "error", "errors"),
        format_count(result.warnings().len(), "warning", "warnings")
    );
    if result.is_valid() {
        Status::success(&summary);
    } else {
        Status::error(&summary);
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count_singular() {
        assert_eq!(format_count(1, "dependency", "dependencies"), "1 dependency");
    }

    #[test]
    fn test_format_count_plural() {
        assert_eq!(format_count(3, "warning", "warnings"), "3 warnings");
        assert_eq!(format_count(0, "error", "errors"), "0 errors");
    }

    #[test]
    fn test_format_entry_with_detail() {
        let entry = ValidationError {
            field: "minSdk".to_string(),
            message: "too high".to_string(),
            code: "ORDER".to_string(),
            expected: Some("<= 35".to_string()),
            actual: Some("36".to_string()),
        };
        assert_eq!(
            format_entry(&entry),
            "minSdk: too high [ORDER] (expected <= 35, found 36)"
        );
    }

    #[test]
    fn test_format_entry_plain() {
        let entry = ValidationError::new("dependencies", "DYNAMIC_VERSION", "avoid 1.+");
        assert_eq!(format_entry(&entry), "dependencies: avoid 1.+ [DYNAMIC_VERSION]");
    }
}
