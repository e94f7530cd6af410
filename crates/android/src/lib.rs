//! Android module build descriptors
//!
//! This crate turns an Android module's `build.gradle.kts` into a validated,
//! immutable [`BuildDescriptor`]:
//! - Kotlin DSL subset lexer and parser
//! - Descriptor model with load-time invariants
//! - Dependency, plugin and signing resolution
//! - Canonical serializer (`load(serialize(d)) == d`)
//! - Lint report and Gradle build execution

pub mod dependency;
pub mod descriptor;
pub mod dsl;
pub mod gradle;
pub mod lint;
pub mod plugins;
pub mod serialize;
pub mod signing;

pub use dependency::{Configuration, DependencyCoordinate, VersionSpec};
pub use descriptor::{BuildDescriptor, DescriptorBuilder, LoadOptions};
pub use gradle::{ArtifactKind, BuildExecutor, GradleExecutor};
pub use lint::{lint, LintContext};
pub use plugins::{PluginReference, PluginRegistry};
pub use signing::{SigningConfig, SigningTable};
