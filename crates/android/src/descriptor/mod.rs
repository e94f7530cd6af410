//! Build descriptor model
//!
//! A [`BuildDescriptor`] is the validated, immutable in-memory form of an
//! Android module build script. It is created by [`BuildDescriptor::load`]
//! (or a [`DescriptorBuilder`]) and never changes afterwards; every operation
//! borrows it.
//!
//! # Example
//!
//! ```rust
//! use droidbuild_android::descriptor::BuildDescriptor;
//!
//! let source = r#"
//! android {
//!     namespace = "com.example.app"
//!     compileSdk = 35
//!     defaultConfig {
//!         applicationId = "com.example.app"
//!         minSdk = 21
//!         targetSdk = 35
//!     }
//! }
//! "#;
//!
//! let descriptor = BuildDescriptor::load(source).unwrap();
//! assert_eq!(descriptor.sdk().min_sdk, 21);
//! assert_eq!(BuildDescriptor::load(&descriptor.serialize()).unwrap(), descriptor);
//! ```

mod reader;

use crate::dependency::{self, DependencyCoordinate};
use crate::plugins::{PluginReference, PluginRegistry};
use crate::signing::{SigningConfig, SigningTable};
use droidbuild_core::config::ToolchainConfig;
use droidbuild_core::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

static REVERSE_DNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$").unwrap());

/// Variants the Android Gradle plugin creates even when `buildTypes` omits them
pub const IMPLICIT_VARIANTS: [&str; 2] = ["debug", "release"];

/// Application id and Kotlin/R-class namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppIdentity {
    pub application_id: String,
    pub namespace: String,
}

impl AppIdentity {
    /// Validate both identifiers as reverse-DNS names
    pub fn new(application_id: impl Into<String>, namespace: impl Into<String>) -> Result<Self> {
        let identity = Self {
            application_id: application_id.into(),
            namespace: namespace.into(),
        };
        for (field, value) in [
            ("android.defaultConfig.applicationId", &identity.application_id),
            ("android.namespace", &identity.namespace),
        ] {
            if !is_reverse_dns(value) {
                return Err(Error::malformed(
                    field,
                    format!("\"{}\" is not a reverse-DNS identifier", value),
                )
                .with_suggestion("Use at least two dot-separated segments, e.g. com.example.app"));
            }
        }
        Ok(identity)
    }
}

/// Whether `value` looks like `com.example.app`
pub fn is_reverse_dns(value: &str) -> bool {
    REVERSE_DNS.is_match(value)
}

/// SDK API levels, ordered `min <= target <= compile`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkLevels {
    pub min_sdk: u32,
    pub target_sdk: u32,
    pub compile_sdk: u32,
}

impl SdkLevels {
    /// Check the ordering invariant
    pub fn new(min_sdk: u32, target_sdk: u32, compile_sdk: u32) -> Result<Self> {
        if min_sdk > target_sdk {
            return Err(Error::invalid_version_constraint(
                "android.defaultConfig.minSdk",
                format!("minSdk ({}) exceeds targetSdk ({})", min_sdk, target_sdk),
            ));
        }
        if target_sdk > compile_sdk {
            return Err(Error::invalid_version_constraint(
                "android.defaultConfig.targetSdk",
                format!("targetSdk ({}) exceeds compileSdk ({})", target_sdk, compile_sdk),
            ));
        }
        Ok(Self {
            min_sdk,
            target_sdk,
            compile_sdk,
        })
    }
}

/// Java feature release (`8` for 1.8, `17` for 17)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JavaVersion(pub u32);

impl JavaVersion {
    /// Parse a `JavaVersion` constant name: `VERSION_17`, `VERSION_1_8`
    pub fn from_constant(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("VERSION_")?;
        let feature = match rest.split('_').collect::<Vec<_>>().as_slice() {
            ["1", minor] => minor.parse().ok()?,
            [major] => major.parse().ok()?,
            _ => return None,
        };
        (feature >= 1).then_some(Self(feature))
    }

    /// Parse a Kotlin `jvmTarget` string: `17`, `1.8`
    pub fn from_jvm_target(value: &str) -> Option<Self> {
        let feature = match value.strip_prefix("1.") {
            Some(minor) => minor.parse().ok()?,
            None => value.parse().ok()?,
        };
        (feature >= 1).then_some(Self(feature))
    }

    /// `JavaVersion` constant name
    pub fn constant(&self) -> String {
        if self.0 <= 10 {
            format!("VERSION_1_{}", self.0)
        } else {
            format!("VERSION_{}", self.0)
        }
    }

    /// Kotlin `jvmTarget` string
    pub fn jvm_target(&self) -> String {
        if self.0 <= 8 {
            format!("1.{}", self.0)
        } else {
            self.0.to_string()
        }
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `compileOptions` and `kotlinOptions`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageCompatibility {
    pub source_compatibility: Option<JavaVersion>,
    pub target_compatibility: Option<JavaVersion>,
    pub jvm_target: Option<JavaVersion>,
    pub core_library_desugaring_enabled: bool,
}

impl LanguageCompatibility {
    /// Check mutual consistency and the host toolchain ceiling
    pub fn validate(&self, max_jvm_target: u32) -> Result<()> {
        for (field, level) in [
            ("android.compileOptions.sourceCompatibility", self.source_compatibility),
            ("android.compileOptions.targetCompatibility", self.target_compatibility),
            ("android.kotlinOptions.jvmTarget", self.jvm_target),
        ] {
            if let Some(level) = level {
                if level.0 == 0 {
                    return Err(Error::invalid_version_constraint(
                        field,
                        "Java level must be at least 1",
                    ));
                }
                if level.0 > max_jvm_target {
                    return Err(Error::invalid_version_constraint(
                        field,
                        format!(
                            "Java {} exceeds the host toolchain maximum ({})",
                            level, max_jvm_target
                        ),
                    )
                    .with_suggestion("Lower the level or raise [toolchain] max_jvm_target"));
                }
            }
        }

        if let (Some(source), Some(target)) = (self.source_compatibility, self.target_compatibility) {
            if source > target {
                return Err(Error::invalid_version_constraint(
                    "android.compileOptions.sourceCompatibility",
                    format!(
                        "sourceCompatibility ({}) exceeds targetCompatibility ({})",
                        source, target
                    ),
                ));
            }
        }

        if let (Some(jvm), Some(target)) = (self.jvm_target, self.target_compatibility) {
            if jvm != target {
                return Err(Error::invalid_version_constraint(
                    "android.kotlinOptions.jvmTarget",
                    format!(
                        "jvmTarget ({}) differs from targetCompatibility ({})",
                        jvm, target
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Whether `compileOptions` has anything to say
    pub fn has_compile_options(&self) -> bool {
        self.source_compatibility.is_some()
            || self.target_compatibility.is_some()
            || self.core_library_desugaring_enabled
    }
}

/// Optional `defaultConfig` settings besides identity and SDK levels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultConfig {
    pub version_code: Option<u32>,
    pub version_name: Option<String>,
    pub multi_dex_enabled: Option<bool>,
}

/// A `buildTypes` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildType {
    pub name: String,
    /// Name of the signing config this variant references
    pub signing_config: Option<String>,
    pub minify_enabled: Option<bool>,
    pub shrink_resources: Option<bool>,
}

impl BuildType {
    /// Build type with no settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signing_config: None,
            minify_enabled: None,
            shrink_resources: None,
        }
    }

    /// Reference a signing config by name
    pub fn signed_with(mut self, signing_config: impl Into<String>) -> Self {
        self.signing_config = Some(signing_config.into());
        self
    }
}

/// `flutter { }` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlutterBlock {
    /// Path to the Flutter project root, relative to the module
    pub source: String,
}

/// Artifact repository declared under `allprojects.repositories`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Repository {
    Google,
    MavenCentral,
    GradlePluginPortal,
    MavenLocal,
    Maven { url: String },
}

impl Repository {
    /// DSL declaration
    pub fn declaration(&self) -> String {
        match self {
            Repository::Google => "google()".to_string(),
            Repository::MavenCentral => "mavenCentral()".to_string(),
            Repository::GradlePluginPortal => "gradlePluginPortal()".to_string(),
            Repository::MavenLocal => "mavenLocal()".to_string(),
            Repository::Maven { url } => format!("maven({})", crate::serialize::quote(url)),
        }
    }
}

/// Options that influence validation during load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Highest Java level the host toolchain supports
    pub max_jvm_target: u32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { max_jvm_target: 21 }
    }
}

impl From<&ToolchainConfig> for LoadOptions {
    fn from(config: &ToolchainConfig) -> Self {
        Self {
            max_jvm_target: config.max_jvm_target,
        }
    }
}

/// Validated, immutable build configuration of one Android module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDescriptor {
    plugins: Vec<PluginReference>,
    identity: AppIdentity,
    sdk: SdkLevels,
    ndk_version: Option<String>,
    compatibility: LanguageCompatibility,
    default_config: DefaultConfig,
    build_types: Vec<BuildType>,
    flutter: Option<FlutterBlock>,
    dependencies: Vec<DependencyCoordinate>,
    repositories: Vec<Repository>,
}

impl BuildDescriptor {
    /// Parse and validate a build script with default options
    pub fn load(source: &str) -> Result<Self> {
        Self::load_with(source, &LoadOptions::default())
    }

    /// Parse and validate a build script
    pub fn load_with(source: &str, options: &LoadOptions) -> Result<Self> {
        let statements = crate::dsl::parse(source)?;
        let descriptor = reader::read(&statements)?.build(options)?;
        tracing::debug!(
            application_id = %descriptor.identity.application_id,
            dependencies = descriptor.dependencies.len(),
            build_types = descriptor.build_types.len(),
            "Loaded build descriptor"
        );
        Ok(descriptor)
    }

    /// Start building a descriptor programmatically
    pub fn builder() -> DescriptorBuilder {
        DescriptorBuilder::default()
    }

    /// Look up `name` in an externally supplied signing table
    pub fn resolve_signing_config<'t>(
        &self,
        name: &str,
        table: &'t SigningTable,
    ) -> Result<&'t SigningConfig> {
        let config = table.resolve(name)?;
        tracing::debug!(name, "Resolved signing config");
        Ok(config)
    }

    /// Resolve the signing reference of every build type that has one
    pub fn resolve_variant_signing<'t>(
        &self,
        table: &'t SigningTable,
    ) -> Result<Vec<(&str, &'t SigningConfig)>> {
        self.build_types
            .iter()
            .filter_map(|bt| bt.signing_config.as_deref().map(|name| (bt, name)))
            .map(|(bt, name)| {
                self.resolve_signing_config(name, table)
                    .map(|config| (bt.name.as_str(), config))
                    .map_err(|e| {
                        e.with_field(format!("android.buildTypes.{}.signingConfig", bt.name))
                    })
            })
            .collect()
    }

    /// Fail with `DuplicateDependency` on the first repeated (group, artifact)
    pub fn validate_dependencies(&self) -> Result<()> {
        dependency::validate_dependencies(&self.dependencies)
    }

    /// Check applied plugins against a registry
    pub fn resolve_plugins(&self, registry: &PluginRegistry) -> Result<()> {
        registry.resolve(&self.plugins)
    }

    /// Every check that needs external tables: dependencies, plugins, signing
    pub fn validate(&self, registry: &PluginRegistry, signing: &SigningTable) -> Result<()> {
        self.validate_dependencies()?;
        self.resolve_plugins(registry)?;
        self.resolve_variant_signing(signing)?;
        Ok(())
    }

    /// Canonical Kotlin DSL text; loads back to an equal descriptor
    pub fn serialize(&self) -> String {
        crate::serialize::to_kotlin_dsl(self)
    }

    pub fn plugins(&self) -> &[PluginReference] {
        &self.plugins
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    pub fn sdk(&self) -> SdkLevels {
        self.sdk
    }

    pub fn ndk_version(&self) -> Option<&str> {
        self.ndk_version.as_deref()
    }

    pub fn compatibility(&self) -> LanguageCompatibility {
        self.compatibility
    }

    pub fn default_config(&self) -> &DefaultConfig {
        &self.default_config
    }

    pub fn build_types(&self) -> &[BuildType] {
        &self.build_types
    }

    /// Declared build type by name
    pub fn build_type(&self, name: &str) -> Option<&BuildType> {
        self.build_types.iter().find(|bt| bt.name == name)
    }

    /// Whether Gradle would know a variant called `name`
    pub fn has_variant(&self, name: &str) -> bool {
        IMPLICIT_VARIANTS.contains(&name) || self.build_type(name).is_some()
    }

    pub fn flutter(&self) -> Option<&FlutterBlock> {
        self.flutter.as_ref()
    }

    pub fn dependencies(&self) -> &[DependencyCoordinate] {
        &self.dependencies
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }
}

/// Validating builder for [`BuildDescriptor`]
#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    plugins: Vec<PluginReference>,
    namespace: Option<String>,
    application_id: Option<String>,
    min_sdk: Option<u32>,
    target_sdk: Option<u32>,
    compile_sdk: Option<u32>,
    ndk_version: Option<String>,
    compatibility: LanguageCompatibility,
    default_config: DefaultConfig,
    build_types: Vec<BuildType>,
    flutter: Option<FlutterBlock>,
    dependencies: Vec<DependencyCoordinate>,
    repositories: Vec<Repository>,
}

impl DescriptorBuilder {
    pub fn plugin(mut self, plugin: PluginReference) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    /// Set `minSdk`, `targetSdk` and `compileSdk`
    pub fn sdk(mut self, min_sdk: u32, target_sdk: u32, compile_sdk: u32) -> Self {
        self.min_sdk = Some(min_sdk);
        self.target_sdk = Some(target_sdk);
        self.compile_sdk = Some(compile_sdk);
        self
    }

    pub fn ndk_version(mut self, ndk_version: impl Into<String>) -> Self {
        self.ndk_version = Some(ndk_version.into());
        self
    }

    pub fn compatibility(mut self, compatibility: LanguageCompatibility) -> Self {
        self.compatibility = compatibility;
        self
    }

    pub fn default_config(mut self, default_config: DefaultConfig) -> Self {
        self.default_config = default_config;
        self
    }

    pub fn build_type(mut self, build_type: BuildType) -> Self {
        self.build_types.push(build_type);
        self
    }

    pub fn flutter_source(mut self, source: impl Into<String>) -> Self {
        self.flutter = Some(FlutterBlock {
            source: source.into(),
        });
        self
    }

    pub fn dependency(mut self, dependency: DependencyCoordinate) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn repository(mut self, repository: Repository) -> Self {
        self.repositories.push(repository);
        self
    }

    /// Check every load-time invariant and produce the descriptor
    pub fn build(self, options: &LoadOptions) -> Result<BuildDescriptor> {
        let namespace = require(self.namespace, "android.namespace")?;
        let compile_sdk = require(self.compile_sdk, "android.compileSdk")?;
        let application_id = require(self.application_id, "android.defaultConfig.applicationId")?;
        let min_sdk = require(self.min_sdk, "android.defaultConfig.minSdk")?;
        let target_sdk = require(self.target_sdk, "android.defaultConfig.targetSdk")?;

        for plugin in &self.plugins {
            plugin.validate()?;
        }

        let identity = AppIdentity::new(application_id, namespace)?;
        let sdk = SdkLevels::new(min_sdk, target_sdk, compile_sdk)?;
        self.compatibility.validate(options.max_jvm_target)?;

        if self.default_config.version_code == Some(0) {
            return Err(Error::invalid_version_constraint(
                "android.defaultConfig.versionCode",
                "versionCode must be a positive integer",
            ));
        }
        if self
            .default_config
            .version_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(Error::malformed(
                "android.defaultConfig.versionName",
                "versionName must not be empty",
            ));
        }
        if self.ndk_version.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(Error::malformed("android.ndkVersion", "ndkVersion must not be empty"));
        }
        if self
            .flutter
            .as_ref()
            .is_some_and(|flutter| flutter.source.trim().is_empty())
        {
            return Err(Error::malformed("flutter.source", "Flutter source path must not be empty"));
        }

        let mut names = HashSet::new();
        for build_type in &self.build_types {
            if !is_build_type_name(&build_type.name) {
                return Err(Error::malformed(
                    "android.buildTypes",
                    format!("Invalid build type name \"{}\"", build_type.name),
                ));
            }
            if !names.insert(build_type.name.as_str()) {
                return Err(Error::malformed(
                    format!("android.buildTypes.{}", build_type.name),
                    format!("Build type \"{}\" is declared more than once", build_type.name),
                ));
            }
            if build_type.signing_config.as_deref() == Some("") {
                return Err(Error::malformed(
                    format!("android.buildTypes.{}.signingConfig", build_type.name),
                    "Signing config name must not be empty",
                ));
            }
        }

        for dependency in &self.dependencies {
            let reparsed = DependencyCoordinate::parse(
                dependency.configuration,
                &dependency.notation(),
                dependency.platform,
            )?;
            if reparsed != *dependency {
                return Err(Error::malformed(
                    format!("dependencies.{}", dependency.configuration),
                    format!("Version of \"{}\" does not match its notation", dependency.notation()),
                ));
            }
        }

        Ok(BuildDescriptor {
            plugins: self.plugins,
            identity,
            sdk,
            ndk_version: self.ndk_version,
            compatibility: self.compatibility,
            default_config: self.default_config,
            build_types: self.build_types,
            flutter: self.flutter,
            dependencies: self.dependencies,
            repositories: self.repositories,
        })
    }
}

fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| {
        Error::malformed(field, format!("Missing required field `{}`", field))
    })
}

/// Build type names become Gradle task suffixes and DSL identifiers
fn is_build_type_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
