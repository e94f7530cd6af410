//! Gradle build execution
//!
//! The descriptor never builds anything itself; it hands a variant to a
//! [`BuildExecutor`]. [`GradleExecutor`] is the real one and drives the
//! project's Gradle wrapper.

use crate::descriptor::BuildDescriptor;
use droidbuild_core::error::{Error, ErrorCode, Result};
use droidbuild_core::process::{run_command_in_dir, run_command_streaming_in_dir};
use serde::Serialize;
use std::path::{Path, PathBuf};

const WRAPPER: &str = if cfg!(windows) { "gradlew.bat" } else { "gradlew" };

/// Lines of Gradle output kept in a failure's context
const FAILURE_TAIL_LINES: usize = 20;

/// What to package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// `assemble<Variant>`
    Apk,
    /// `bundle<Variant>` (Android App Bundle)
    Bundle,
}

impl ArtifactKind {
    fn task_prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Apk => "assemble",
            ArtifactKind::Bundle => "bundle",
        }
    }
}

/// Result of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub variant: String,
    pub artifact: ArtifactKind,
    pub task: String,
    /// Captured output; `None` when it was streamed to the terminal
    pub output: Option<String>,
}

/// Something that can build a variant of a descriptor
pub trait BuildExecutor {
    fn execute(
        &self,
        descriptor: &BuildDescriptor,
        variant: &str,
        artifact: ArtifactKind,
    ) -> Result<BuildOutcome>;
}

/// Gradle task for a variant: `release` + `Apk` is `assembleRelease`
pub fn task_name(variant: &str, artifact: ArtifactKind) -> String {
    let mut chars = variant.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{}{}", artifact.task_prefix(), capitalized)
}

/// Fail with `MalformedConfig` unless Gradle would know `variant`
pub fn check_variant(descriptor: &BuildDescriptor, variant: &str) -> Result<()> {
    if descriptor.has_variant(variant) {
        return Ok(());
    }
    let mut known: Vec<&str> = crate::descriptor::IMPLICIT_VARIANTS.to_vec();
    for build_type in descriptor.build_types() {
        if !known.contains(&build_type.name.as_str()) {
            known.push(&build_type.name);
        }
    }
    Err(Error::malformed(
        "android.buildTypes",
        format!("Build variant \"{}\" is not declared", variant),
    )
    .with_context(format!("Known variants: {}", known.join(", "))))
}

/// Nearest directory at or above the script's directory holding a Gradle wrapper
pub fn locate_project_dir(script: &Path) -> Option<PathBuf> {
    script
        .parent()
        .into_iter()
        .flat_map(Path::ancestors)
        .find(|dir| dir.join(WRAPPER).is_file())
        .map(Path::to_path_buf)
}

/// Runs `gradlew` in a project directory
#[derive(Debug, Clone)]
pub struct GradleExecutor {
    project_dir: PathBuf,
    stream: bool,
}

impl GradleExecutor {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            stream: false,
        }
    }

    /// Send Gradle output to the terminal instead of capturing it
    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn wrapper(&self) -> Result<String> {
        let path = self.project_dir.join(WRAPPER);
        if !path.is_file() {
            return Err(Error::file_not_found(&path).with_suggestion(
                "Run `flutter build apk` once, or `gradle wrapper`, to generate the Gradle wrapper",
            ));
        }
        Ok(if cfg!(windows) {
            WRAPPER.to_string()
        } else {
            format!("./{}", WRAPPER)
        })
    }
}

impl BuildExecutor for GradleExecutor {
    fn execute(
        &self,
        descriptor: &BuildDescriptor,
        variant: &str,
        artifact: ArtifactKind,
    ) -> Result<BuildOutcome> {
        check_variant(descriptor, variant)?;
        let wrapper = self.wrapper()?;
        let task = task_name(variant, artifact);
        tracing::info!(task = %task, dir = %self.project_dir.display(), "Running Gradle");

        let (exit_code, output) = if self.stream {
            (
                run_command_streaming_in_dir(&wrapper, &[&task], &self.project_dir)?,
                None,
            )
        } else {
            let result = run_command_in_dir(&wrapper, &[&task], &self.project_dir)?;
            (result.exit_code, Some(result.combined_output()))
        };

        if exit_code != 0 {
            let mut err = Error::new(
                ErrorCode::GradleError,
                format!("Gradle task {} failed with exit code {}", task, exit_code),
            );
            if let Some(output) = &output {
                let lines: Vec<&str> = output.lines().collect();
                let tail = &lines[lines.len().saturating_sub(FAILURE_TAIL_LINES)..];
                err = err.with_context(tail.join("\n"));
            }
            return Err(err);
        }

        tracing::debug!(task = %task, "Gradle task succeeded");
        Ok(BuildOutcome {
            variant: variant.to_string(),
            artifact,
            task,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCRIPT: &str = r#"
android {
    namespace = "com.example.app"
    compileSdk = 35
    defaultConfig {
        applicationId = "com.example.app"
        minSdk = 21
        targetSdk = 35
    }
    buildTypes {
        create("staging") { }
    }
}
"#;

    fn descriptor() -> BuildDescriptor {
        BuildDescriptor::load(SCRIPT).unwrap()
    }

    #[test]
    fn test_task_name() {
        assert_eq!(task_name("release", ArtifactKind::Apk), "assembleRelease");
        assert_eq!(task_name("debug", ArtifactKind::Bundle), "bundleDebug");
        assert_eq!(task_name("stagingQa", ArtifactKind::Apk), "assembleStagingQa");
    }

    #[test]
    fn test_check_variant() {
        let d = descriptor();
        assert!(check_variant(&d, "debug").is_ok());
        assert!(check_variant(&d, "release").is_ok());
        assert!(check_variant(&d, "staging").is_ok());

        let err = check_variant(&d, "qa").unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedConfig);
        assert_eq!(
            err.context.as_deref(),
            Some("Known variants: debug, release, staging")
        );
    }

    #[test]
    fn test_undeclared_variant_fails_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let err = GradleExecutor::new(dir.path())
            .execute(&descriptor(), "qa", ArtifactKind::Apk)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedConfig);
    }

    #[test]
    fn test_missing_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let err = GradleExecutor::new(dir.path())
            .execute(&descriptor(), "debug", ArtifactKind::Apk)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }

    #[test]
    fn test_locate_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("android").join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(dir.path().join("android").join(WRAPPER), "").unwrap();
        let script = app.join("build.gradle.kts");

        assert_eq!(
            locate_project_dir(&script),
            Some(dir.path().join("android"))
        );
        assert_eq!(locate_project_dir(Path::new("build.gradle.kts")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_wrapper() {
        use std::os::unix::fs::PermissionsExt;

        fn project(body: &str) -> tempfile::TempDir {
            let dir = tempfile::tempdir().unwrap();
            let wrapper = dir.path().join(WRAPPER);
            fs::write(&wrapper, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&wrapper, fs::Permissions::from_mode(0o755)).unwrap();
            dir
        }

        let ok = project("echo \"task $1\"");
        let failing = project("echo \"FAILURE: $1\" >&2\nexit 3");
        let d = descriptor();

        let outcome = GradleExecutor::new(ok.path())
            .execute(&d, "staging", ArtifactKind::Bundle)
            .unwrap();
        assert_eq!(outcome.task, "bundleStaging");
        assert!(outcome.output.unwrap().contains("task bundleStaging"));

        let err = GradleExecutor::new(failing.path())
            .execute(&d, "release", ArtifactKind::Apk)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::GradleError);
        assert!(err.message.contains("exit code 3"));
        assert!(err.context.unwrap().contains("FAILURE: assembleRelease"));
    }
}
