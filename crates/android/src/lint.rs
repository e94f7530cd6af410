//! Descriptor lint
//!
//! Unlike [`BuildDescriptor::validate`], linting never stops at the first
//! problem: every failing check lands in a [`ValidationResult`] as an error,
//! and questionable but loadable settings are reported as warnings.

use crate::dependency::{self, Configuration, VersionSpec};
use crate::descriptor::BuildDescriptor;
use crate::plugins::PluginRegistry;
use crate::signing::SigningTable;
use droidbuild_core::error::Error;
use droidbuild_core::validation::{ValidationResult, Validator};
use std::collections::HashSet;

/// Warning codes
pub mod codes {
    pub const DEBUG_SIGNED_RELEASE: &str = "DEBUG_SIGNED_RELEASE";
    pub const UNMANAGED_VERSION: &str = "UNMANAGED_VERSION";
    pub const DYNAMIC_VERSION: &str = "DYNAMIC_VERSION";
    pub const REDUNDANT_MULTIDEX: &str = "REDUNDANT_MULTIDEX";
    pub const DESUGARING_MISMATCH: &str = "DESUGARING_MISMATCH";
}

/// First API level with native multidex support
const NATIVE_MULTIDEX_MIN_SDK: u32 = 21;

/// Tables and switches a lint run checks against
#[derive(Debug, Clone, Copy)]
pub struct LintContext<'a> {
    pub registry: &'a PluginRegistry,
    pub signing: &'a SigningTable,
    /// Silence the debug-signed release warning
    pub allow_debug_signed_release: bool,
}

/// Review a loaded descriptor
pub fn lint(descriptor: &BuildDescriptor, ctx: &LintContext<'_>) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.merge(errors(descriptor, ctx));
    result.merge(warnings(descriptor, ctx));

    for warning in result.warnings() {
        tracing::warn!(field = %warning.field, code = %warning.code, "{}", warning.message);
    }
    tracing::debug!(
        errors = result.errors().len(),
        warnings = result.warnings().len(),
        "Lint finished"
    );
    result
}

fn errors(descriptor: &BuildDescriptor, ctx: &LintContext<'_>) -> ValidationResult {
    let mut validator = Validator::new();

    for (group, artifact) in dependency::duplicate_pairs(descriptor.dependencies()) {
        validator = validator.check::<()>(&Err(Error::duplicate_dependency(&group, &artifact)));
    }

    for problem in ctx.registry.problems(descriptor.plugins()) {
        validator = validator.check::<()>(&Err(problem));
    }

    for build_type in descriptor.build_types() {
        if let Some(name) = &build_type.signing_config {
            let outcome = descriptor.resolve_signing_config(name, ctx.signing).map_err(|e| {
                e.with_field(format!("android.buildTypes.{}.signingConfig", build_type.name))
            });
            validator = validator.check(&outcome);
        }
    }

    validator.validate()
}

fn warnings(descriptor: &BuildDescriptor, ctx: &LintContext<'_>) -> ValidationResult {
    let deps = descriptor.dependencies();
    let default_config = descriptor.default_config();
    let compatibility = descriptor.compatibility();

    let release_on_debug = descriptor
        .build_type("release")
        .and_then(|bt| bt.signing_config.as_deref())
        .is_some_and(|name| name == crate::signing::DEBUG_SIGNING_CONFIG);

    let mut validator = Validator::new().warn_if(
        "android.buildTypes.release.signingConfig",
        codes::DEBUG_SIGNED_RELEASE,
        release_on_debug && !ctx.allow_debug_signed_release,
        "Release builds are signed with the debug key and cannot be published",
    );

    let managed_groups: HashSet<&str> = deps
        .iter()
        .filter(|d| d.platform)
        .map(|d| d.group.as_str())
        .collect();

    for dep in deps {
        let field = format!("dependencies.{}", dep.configuration);
        validator = validator
            .warn_if(
                &field,
                codes::UNMANAGED_VERSION,
                dep.version == VersionSpec::Managed && !managed_groups.contains(dep.group.as_str()),
                &format!(
                    "{} has no version and no platform import for group {}",
                    dep.notation(),
                    dep.group
                ),
            )
            .warn_if(
                &field,
                codes::DYNAMIC_VERSION,
                matches!(dep.version, VersionSpec::Dynamic(_)),
                &format!("{} uses a dynamic version; builds are not reproducible", dep.notation()),
            );
    }

    let min_sdk = descriptor.sdk().min_sdk;
    validator = validator.warn_if(
        "android.defaultConfig.multiDexEnabled",
        codes::REDUNDANT_MULTIDEX,
        default_config.multi_dex_enabled == Some(true) && min_sdk >= NATIVE_MULTIDEX_MIN_SDK,
        &format!("minSdk {} supports multidex natively; multiDexEnabled is redundant", min_sdk),
    );

    let has_desugar_lib = deps
        .iter()
        .any(|d| d.configuration == Configuration::CoreLibraryDesugaring);
    let desugaring = compatibility.core_library_desugaring_enabled;
    validator
        .warn_if(
            "android.compileOptions.isCoreLibraryDesugaringEnabled",
            codes::DESUGARING_MISMATCH,
            desugaring && !has_desugar_lib,
            "Desugaring is enabled but no coreLibraryDesugaring dependency is declared",
        )
        .warn_if(
            "dependencies.coreLibraryDesugaring",
            codes::DESUGARING_MISMATCH,
            has_desugar_lib && !desugaring,
            "coreLibraryDesugaring dependency declared but desugaring is not enabled",
        )
        .validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
plugins {
    id("com.android.application")
    id("kotlin-android")
    id("dev.flutter.flutter-gradle-plugin")
}

android {
    namespace = "com.example.app"
    compileSdk = 35
    defaultConfig {
        applicationId = "com.example.app"
        minSdk = 21
        targetSdk = 35
    }
}
"#;

    fn run(source: &str, signing: &SigningTable, allow_debug: bool) -> ValidationResult {
        let descriptor = BuildDescriptor::load(source).unwrap();
        let registry = PluginRegistry::builtin();
        lint(
            &descriptor,
            &LintContext {
                registry: &registry,
                signing,
                allow_debug_signed_release: allow_debug,
            },
        )
    }

    fn warning_codes(result: &ValidationResult) -> Vec<&str> {
        result.warnings().iter().map(|w| w.code.as_str()).collect()
    }

    fn with_deps(deps: &str) -> String {
        format!("{}\ndependencies {{\n{}\n}}\n", BASE, deps)
    }

    #[test]
    fn test_clean_descriptor() {
        let result = run(BASE, &SigningTable::new().with_agp_debug(), false);
        assert!(result.is_valid());
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn test_app_script_warnings() {
        let source = include_str!("../tests/fixtures/app.build.gradle.kts");
        let result = run(source, &SigningTable::new().with_agp_debug(), false);
        assert!(result.is_valid());
        assert_eq!(
            warning_codes(&result),
            vec![codes::DEBUG_SIGNED_RELEASE, codes::REDUNDANT_MULTIDEX]
        );
    }

    #[test]
    fn test_debug_signed_release_allowed() {
        let source = include_str!("../tests/fixtures/app.build.gradle.kts");
        let result = run(source, &SigningTable::new().with_agp_debug(), true);
        assert!(!warning_codes(&result).contains(&codes::DEBUG_SIGNED_RELEASE));
    }

    #[test]
    fn test_collects_every_error() {
        let source = format!(
            "{}\ndependencies {{\n    implementation(\"a.b:c:1.0\")\n    api(\"a.b:c:2.0\")\n}}\n",
            BASE.replace(
                "    compileSdk = 35\n",
                "    compileSdk = 35\n    buildTypes {\n        release { signingConfig = signingConfigs.getByName(\"upload\") }\n    }\n"
            )
            .replace("id(\"kotlin-android\")", "id(\"com.example.mystery\")")
        );
        let result = run(&source, &SigningTable::new().with_agp_debug(), false);
        let codes: Vec<&str> = result.errors().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(
            codes,
            vec!["DuplicateDependency", "UnresolvedPlugin", "UnknownSigningConfig"]
        );
        assert_eq!(
            result.errors()[2].field,
            "android.buildTypes.release.signingConfig"
        );
    }

    #[test]
    fn test_versionless_dependency() {
        let result = run(
            &with_deps("    implementation(\"com.google.firebase:firebase-auth-ktx\")"),
            &SigningTable::new(),
            false,
        );
        assert_eq!(warning_codes(&result), vec![codes::UNMANAGED_VERSION]);

        let result = run(
            &with_deps(
                "    implementation(platform(\"com.google.firebase:firebase-bom:32.8.1\"))\n    implementation(\"com.google.firebase:firebase-auth-ktx\")",
            ),
            &SigningTable::new(),
            false,
        );
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn test_dynamic_version() {
        let result = run(
            &with_deps("    implementation(\"androidx.core:core-ktx:1.+\")"),
            &SigningTable::new(),
            false,
        );
        assert_eq!(warning_codes(&result), vec![codes::DYNAMIC_VERSION]);
    }

    #[test]
    fn test_desugaring_without_flag() {
        let result = run(
            &with_deps("    coreLibraryDesugaring(\"com.android.tools:desugar_jdk_libs:2.0.4\")"),
            &SigningTable::new(),
            false,
        );
        assert_eq!(warning_codes(&result), vec![codes::DESUGARING_MISMATCH]);
        assert_eq!(result.warnings()[0].field, "dependencies.coreLibraryDesugaring");
    }

    #[test]
    fn test_deny_warnings() {
        let result = run(
            &with_deps("    implementation(\"androidx.core:core-ktx:1.+\")"),
            &SigningTable::new(),
            false,
        );
        assert!(result.is_valid());
        assert!(!result.deny_warnings().is_valid());
    }
}
