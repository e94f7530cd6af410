//! Dependency declarations
//!
//! A declaration pairs a Gradle configuration (`implementation`,
//! `coreLibraryDesugaring`, ...) with a `group:artifact[:version]` notation,
//! optionally wrapped in `platform(...)` for BOM imports.

use droidbuild_core::error::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Gradle configuration a dependency is declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Configuration {
    Implementation,
    Api,
    CompileOnly,
    RuntimeOnly,
    TestImplementation,
    AndroidTestImplementation,
    /// Desugared JDK library; consumed by D8/R8 at compile time only
    CoreLibraryDesugaring,
}

/// Classpath a configuration contributes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Compile,
    Runtime,
    CompileAndRuntime,
}

impl Configuration {
    /// All supported configurations
    pub const ALL: [Configuration; 7] = [
        Configuration::Implementation,
        Configuration::Api,
        Configuration::CompileOnly,
        Configuration::RuntimeOnly,
        Configuration::TestImplementation,
        Configuration::AndroidTestImplementation,
        Configuration::CoreLibraryDesugaring,
    ];

    /// Parse a DSL configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// DSL name
    pub fn as_str(&self) -> &'static str {
        match self {
            Configuration::Implementation => "implementation",
            Configuration::Api => "api",
            Configuration::CompileOnly => "compileOnly",
            Configuration::RuntimeOnly => "runtimeOnly",
            Configuration::TestImplementation => "testImplementation",
            Configuration::AndroidTestImplementation => "androidTestImplementation",
            Configuration::CoreLibraryDesugaring => "coreLibraryDesugaring",
        }
    }

    /// Classpath the configuration feeds
    pub fn scope(&self) -> Scope {
        match self {
            Configuration::CompileOnly | Configuration::CoreLibraryDesugaring => Scope::Compile,
            Configuration::RuntimeOnly => Scope::Runtime,
            _ => Scope::CompileAndRuntime,
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version part of a coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VersionSpec {
    /// `2.0.4`
    Exact(String),
    /// `[1.0,2.0)`
    Range(String),
    /// `1.+`, `latest.release`
    Dynamic(String),
    /// No version; expected to come from a platform (BOM) import
    Managed,
}

impl VersionSpec {
    /// Classify a version string
    pub fn parse(version: &str) -> Self {
        if version.starts_with('[') || version.starts_with('(') || version.starts_with(']') {
            VersionSpec::Range(version.to_string())
        } else if version.ends_with('+') || version.starts_with("latest.") {
            VersionSpec::Dynamic(version.to_string())
        } else {
            VersionSpec::Exact(version.to_string())
        }
    }

    /// Version text, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VersionSpec::Exact(v) | VersionSpec::Range(v) | VersionSpec::Dynamic(v) => Some(v),
            VersionSpec::Managed => None,
        }
    }
}

/// A single dependency declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyCoordinate {
    pub configuration: Configuration,
    pub group: String,
    pub artifact: String,
    pub version: VersionSpec,
    /// Declared through `platform(...)`: constrains versions, not linked
    pub platform: bool,
}

fn valid_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

fn valid_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ".-_+[](),".contains(c))
}

impl DependencyCoordinate {
    /// Parse `group:artifact[:version]`
    pub fn parse(configuration: Configuration, notation: &str, platform: bool) -> Result<Self> {
        let field = format!("dependencies.{}", configuration);
        let parts: Vec<&str> = notation.split(':').collect();
        let (group, artifact, version) = match parts.as_slice() {
            [group, artifact] => (*group, *artifact, None),
            [group, artifact, version] => (*group, *artifact, Some(*version)),
            _ => {
                return Err(Error::malformed(
                    field,
                    format!(
                        "Expected group:artifact[:version], found \"{}\"",
                        notation
                    ),
                ))
            }
        };

        if !valid_part(group) || !valid_part(artifact) {
            return Err(Error::malformed(
                field,
                format!("Invalid group or artifact in \"{}\"", notation),
            ));
        }

        let version = match version {
            Some(v) if !valid_version(v) => {
                return Err(Error::malformed(
                    field,
                    format!("Invalid version in \"{}\"", notation),
                ))
            }
            Some(v) => VersionSpec::parse(v),
            None if platform => {
                return Err(Error::malformed(
                    field,
                    format!("Platform import \"{}\" needs a version", notation),
                ))
            }
            None => VersionSpec::Managed,
        };

        Ok(Self {
            configuration,
            group: group.to_string(),
            artifact: artifact.to_string(),
            version,
            platform,
        })
    }

    /// `group:artifact[:version]`
    pub fn notation(&self) -> String {
        match self.version.as_str() {
            Some(version) => format!("{}:{}:{}", self.group, self.artifact, version),
            None => format!("{}:{}", self.group, self.artifact),
        }
    }

    /// Uniqueness key
    pub fn key(&self) -> (&str, &str) {
        (&self.group, &self.artifact)
    }
}

impl fmt::Display for DependencyCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.platform {
            write!(f, "{}(platform(\"{}\"))", self.configuration, self.notation())
        } else {
            write!(f, "{}(\"{}\")", self.configuration, self.notation())
        }
    }
}

/// Every (group, artifact) pair declared more than once, in first-seen order
pub fn duplicate_pairs(dependencies: &[DependencyCoordinate]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();
    for dependency in dependencies {
        let key = dependency.key();
        if !seen.insert(key) && reported.insert(key) {
            duplicates.push((key.0.to_string(), key.1.to_string()));
        }
    }
    duplicates
}

/// Fail on the first duplicate (group, artifact) pair
pub fn validate_dependencies(dependencies: &[DependencyCoordinate]) -> Result<()> {
    match duplicate_pairs(dependencies).into_iter().next() {
        Some((group, artifact)) => Err(Error::duplicate_dependency(&group, &artifact)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidbuild_core::ErrorCode;

    fn dep(notation: &str) -> DependencyCoordinate {
        DependencyCoordinate::parse(Configuration::Implementation, notation, false).unwrap()
    }

    #[test]
    fn test_parse_exact() {
        let d = dep("androidx.multidex:multidex:2.0.1");
        assert_eq!(d.group, "androidx.multidex");
        assert_eq!(d.artifact, "multidex");
        assert_eq!(d.version, VersionSpec::Exact("2.0.1".into()));
        assert_eq!(d.notation(), "androidx.multidex:multidex:2.0.1");
    }

    #[test]
    fn test_parse_managed_and_dynamic() {
        assert_eq!(
            dep("com.google.firebase:firebase-auth-ktx").version,
            VersionSpec::Managed
        );
        assert_eq!(
            dep("com.squareup:okio:3.+").version,
            VersionSpec::Dynamic("3.+".into())
        );
        assert_eq!(
            dep("com.squareup:okio:[3.0,4.0)").version,
            VersionSpec::Range("[3.0,4.0)".into())
        );
    }

    #[test]
    fn test_platform_requires_version() {
        let err = DependencyCoordinate::parse(
            Configuration::Implementation,
            "com.google.firebase:firebase-bom",
            true,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedConfig);
    }

    #[test]
    fn test_rejects_bad_notation() {
        for notation in ["", "onlygroup", "a:b:c:d", ":artifact:1.0", "g:a b:1.0"] {
            let err =
                DependencyCoordinate::parse(Configuration::Api, notation, false).unwrap_err();
            assert_eq!(err.code, ErrorCode::MalformedConfig, "{}", notation);
            assert_eq!(err.field.as_deref(), Some("dependencies.api"));
        }
    }

    #[test]
    fn test_display_declaration() {
        let bom = DependencyCoordinate::parse(
            Configuration::Implementation,
            "com.google.firebase:firebase-bom:32.8.1",
            true,
        )
        .unwrap();
        assert_eq!(
            bom.to_string(),
            "implementation(platform(\"com.google.firebase:firebase-bom:32.8.1\"))"
        );
    }

    #[test]
    fn test_desugaring_scope_is_compile_only() {
        assert_eq!(Configuration::CoreLibraryDesugaring.scope(), Scope::Compile);
        assert_eq!(Configuration::RuntimeOnly.scope(), Scope::Runtime);
        assert_eq!(
            Configuration::Implementation.scope(),
            Scope::CompileAndRuntime
        );
        assert_eq!(
            Configuration::from_name("coreLibraryDesugaring"),
            Some(Configuration::CoreLibraryDesugaring)
        );
        assert_eq!(Configuration::from_name("kapt"), None);
    }

    #[test]
    fn test_platform_and_plain_duplicate() {
        let bom = DependencyCoordinate::parse(
            Configuration::Implementation,
            "com.google.firebase:firebase-bom:32.8.1",
            true,
        )
        .unwrap();
        let plain = dep("com.google.firebase:firebase-bom:32.8.1");

        let err = validate_dependencies(&[bom, plain]).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateDependency);
        assert!(err.message.contains("com.google.firebase:firebase-bom"));
    }

    #[test]
    fn test_duplicate_across_configurations() {
        let a = dep("junit:junit:4.13.2");
        let b = DependencyCoordinate::parse(Configuration::TestImplementation, "junit:junit:4.13.1", false)
            .unwrap();
        assert!(validate_dependencies(&[a, b]).is_err());
    }

    #[test]
    fn test_duplicate_pairs_reported_once() {
        let deps = vec![dep("a:b:1"), dep("a:b:2"), dep("a:b:3"), dep("c:d:1")];
        assert_eq!(duplicate_pairs(&deps), vec![("a".to_string(), "b".to_string())]);
        assert!(validate_dependencies(&deps[3..]).is_ok());
    }
}
