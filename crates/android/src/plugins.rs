//! Plugin references and the registry they resolve against

use crate::serialize::quote;
use droidbuild_core::error::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

pub const ANDROID_APPLICATION: &str = "com.android.application";
pub const ANDROID_LIBRARY: &str = "com.android.library";
pub const FLUTTER_GRADLE_PLUGIN: &str = "dev.flutter.flutter-gradle-plugin";
const KOTLIN_PREFIX: &str = "org.jetbrains.kotlin.";
const KOTLIN_ANDROID_IDS: [&str; 2] = ["kotlin-android", "org.jetbrains.kotlin.android"];

/// Legacy ids and the plugin ids they apply
const PLUGIN_ALIASES: [(&str, &str); 2] = [
    ("kotlin-android", "org.jetbrains.kotlin.android"),
    ("kotlin-kapt", "org.jetbrains.kotlin.kapt"),
];

/// Id Gradle actually applies for `id`
fn canonical_id(id: &str) -> &str {
    PLUGIN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == id)
        .map_or(id, |(_, canonical)| *canonical)
}

const BUILTIN_PLUGINS: [&str; 9] = [
    ANDROID_APPLICATION,
    ANDROID_LIBRARY,
    "com.google.gms.google-services",
    "com.google.firebase.crashlytics",
    "kotlin-android",
    "kotlin-kapt",
    "org.jetbrains.kotlin.android",
    "org.jetbrains.kotlin.kapt",
    FLUTTER_GRADLE_PLUGIN,
];

/// How a plugin was written in the `plugins` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginSyntax {
    /// `id("com.android.application")`
    Id,
    /// `kotlin("android")`, shorthand for `org.jetbrains.kotlin.android`
    Kotlin,
}

/// A plugin applied by the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginReference {
    pub id: String,
    pub syntax: PluginSyntax,
}

impl PluginReference {
    /// `id("...")` form
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            syntax: PluginSyntax::Id,
        }
    }

    /// `kotlin("...")` form
    pub fn kotlin(module: &str) -> Self {
        Self {
            id: format!("{}{}", KOTLIN_PREFIX, module),
            syntax: PluginSyntax::Kotlin,
        }
    }

    /// Fail unless the reference can be written back as it was read
    pub fn validate(&self) -> Result<()> {
        let malformed =
            |message: String| -> Result<()> { Err(Error::malformed("plugins", message)) };
        match self.syntax {
            PluginSyntax::Id if self.id.trim().is_empty() => {
                malformed("Plugin id must not be empty".to_string())
            }
            PluginSyntax::Kotlin => match self.id.strip_prefix(KOTLIN_PREFIX) {
                Some(module) if !module.trim().is_empty() => Ok(()),
                _ => malformed(format!(
                    "kotlin(...) plugin id must be {}<module>, found \"{}\"",
                    KOTLIN_PREFIX, self.id
                )),
            },
            PluginSyntax::Id => Ok(()),
        }
    }

    /// DSL declaration for this reference
    pub fn declaration(&self) -> String {
        match self.syntax {
            PluginSyntax::Kotlin => format!(
                "kotlin({})",
                quote(self.id.strip_prefix(KOTLIN_PREFIX).unwrap_or(&self.id))
            ),
            PluginSyntax::Id => format!("id({})", quote(&self.id)),
        }
    }
}

/// Plugin ids the external toolchain can resolve
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    known: BTreeSet<String>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PluginRegistry {
    /// Registry with the Android, Kotlin, Firebase and Flutter plugins
    pub fn builtin() -> Self {
        Self {
            known: BUILTIN_PLUGINS.iter().map(|id| id.to_string()).collect(),
        }
    }

    /// Add extra ids, typically from `[plugins] known`
    pub fn with_known<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Whether `id` is resolvable
    pub fn contains(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Every problem with the applied plugin list, in declaration order
    pub fn problems(&self, plugins: &[PluginReference]) -> Vec<Error> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for plugin in plugins {
            if !self.contains(&plugin.id) {
                problems.push(
                    Error::unresolved_plugin(&plugin.id, format!("Unknown plugin id: {}", plugin.id))
                        .with_suggestion("Add the id to [plugins] known in .droidbuild.toml"),
                );
            }
            if !seen.insert(canonical_id(&plugin.id)) {
                problems.push(Error::unresolved_plugin(
                    &plugin.id,
                    format!("Plugin applied more than once: {}", plugin.id),
                ));
            }
        }

        let position = |ids: &[&str]| plugins.iter().position(|p| ids.contains(&p.id.as_str()));
        let android = position(&[ANDROID_APPLICATION, ANDROID_LIBRARY]);

        if plugins.iter().any(|p| p.id == ANDROID_APPLICATION)
            && plugins.iter().any(|p| p.id == ANDROID_LIBRARY)
        {
            problems.push(Error::unresolved_plugin(
                ANDROID_LIBRARY,
                "A module cannot apply both the application and library plugins",
            ));
        }

        if let Some(flutter) = position(&[FLUTTER_GRADLE_PLUGIN]) {
            match android {
                None => problems.push(Error::unresolved_plugin(
                    FLUTTER_GRADLE_PLUGIN,
                    "The Flutter Gradle plugin requires an Android plugin",
                )),
                Some(android) if android > flutter => problems.push(
                    Error::unresolved_plugin(
                        FLUTTER_GRADLE_PLUGIN,
                        "The Flutter Gradle plugin must be applied after the Android plugin",
                    ),
                ),
                Some(_) => {}
            }
            if position(&KOTLIN_ANDROID_IDS).is_some_and(|kotlin| kotlin > flutter) {
                problems.push(Error::unresolved_plugin(
                    FLUTTER_GRADLE_PLUGIN,
                    "The Flutter Gradle plugin must be applied after the Kotlin Android plugin",
                ));
            }
        }

        problems
    }

    /// Fail with the first unresolved plugin
    pub fn resolve(&self, plugins: &[PluginReference]) -> Result<()> {
        match self.problems(plugins).into_iter().next() {
            Some(err) => Err(err),
            None => {
                tracing::debug!(count = plugins.len(), "Plugins resolved");
                Ok(())
            }
        }
    }
}
