//! Process execution utilities
//!
//! Runs the external build executor (Gradle) with captured or streamed output.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Result of a command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code of the command
    pub exit_code: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandResult {
    /// Create from std::process::Output
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Get combined output (stdout + stderr)
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::command_not_found(program).with_source(err)
    } else {
        Error::process(format!("Failed to execute {}: {}", program, err)).with_source(err)
    }
}

/// Run a command in a specific directory and capture its output
pub fn run_command_in_dir(program: &str, args: &[&str], dir: &Path) -> Result<CommandResult> {
    tracing::debug!(program, ?args, dir = %dir.display(), "Running command");
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    Ok(CommandResult::from_output(output))
}

/// Run a command in a specific directory, streaming output to the terminal
pub fn run_command_streaming_in_dir(program: &str, args: &[&str], dir: &Path) -> Result<i32> {
    tracing::debug!(program, ?args, dir = %dir.display(), "Running command (streaming)");
    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(program, e))?;

    Ok(status.code().unwrap_or(-1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[cfg(unix)]
    #[test]
    fn test_run_command_echo() {
        let result = run_command_in_dir("echo", &["hello"], Path::new(".")).unwrap();
        assert!(result.success);
        assert!(result.stdout.contains("hello"));
    }

    #[test]
    fn test_missing_program() {
        let err = run_command_in_dir("nonexistent_command_12345", &[], Path::new(".")).unwrap_err();
        assert_eq!(err.code, ErrorCode::CommandNotFound);
    }

    #[test]
    fn test_command_result_combined_output() {
        let result = CommandResult {
            success: true,
            exit_code: 0,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert!(result.combined_output().contains("out"));
        assert!(result.combined_output().contains("err"));
    }
}
