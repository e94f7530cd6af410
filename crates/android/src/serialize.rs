//! Canonical Kotlin DSL writer
//!
//! Sections are always emitted in the same order with four-space indentation,
//! empty sections are omitted, and every value is written in the form the
//! reader accepts, so `load(serialize(d)) == d`.

use crate::descriptor::{BuildDescriptor, LoadOptions, Repository};
use crate::dsl;
use droidbuild_core::error::Result;

const INDENT: &str = "    ";

/// Quote and escape a string literal
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn assign(&mut self, key: &str, value: impl std::fmt::Display) {
        self.line(&format!("{} = {}", key, value));
    }

    fn open(&mut self, header: &str) {
        self.line(&format!("{} {{", header));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth -= 1;
        self.line("}");
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }
}

/// Render a descriptor as a `build.gradle.kts` script
pub fn to_kotlin_dsl(descriptor: &BuildDescriptor) -> String {
    let mut w = Writer {
        out: String::new(),
        depth: 0,
    };

    if !descriptor.plugins().is_empty() {
        w.open("plugins");
        for plugin in descriptor.plugins() {
            w.line(&plugin.declaration());
        }
        w.close();
        w.blank();
    }

    write_android(&mut w, descriptor);

    if let Some(flutter) = descriptor.flutter() {
        w.blank();
        w.open("flutter");
        w.assign("source", quote(&flutter.source));
        w.close();
    }

    if !descriptor.dependencies().is_empty() {
        w.blank();
        w.open("dependencies");
        for dependency in descriptor.dependencies() {
            w.line(&dependency.to_string());
        }
        w.close();
    }

    if !descriptor.repositories().is_empty() {
        w.blank();
        w.open("allprojects");
        w.open("repositories");
        for repository in descriptor.repositories() {
            match repository {
                Repository::Maven { url } => {
                    w.open("maven");
                    w.assign("url", format!("uri({})", quote(url)));
                    w.close();
                }
                other => w.line(&other.declaration()),
            }
        }
        w.close();
        w.close();
    }

    w.out
}

/// Canonical rewrite of a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    /// Source already in canonical form
    pub unchanged: bool,
    /// Comments in the source that the canonical text does not carry
    pub dropped_comments: usize,
}

/// Load `source` and render it canonically
pub fn format_script(source: &str, options: &LoadOptions) -> Result<Formatted> {
    let descriptor = BuildDescriptor::load_with(source, options)?;
    let dropped_comments = dsl::count_comments(source)?;
    let text = to_kotlin_dsl(&descriptor);
    Ok(Formatted {
        unchanged: text == source,
        text,
        dropped_comments,
    })
}

fn write_android(w: &mut Writer, descriptor: &BuildDescriptor) {
    let identity = descriptor.identity();
    let sdk = descriptor.sdk();
    let compatibility = descriptor.compatibility();
    let default_config = descriptor.default_config();

    w.open("android");
    w.assign("namespace", quote(&identity.namespace));
    w.assign("compileSdk", sdk.compile_sdk);
    if let Some(ndk) = descriptor.ndk_version() {
        w.assign("ndkVersion", quote(ndk));
    }

    if compatibility.has_compile_options() {
        w.blank();
        w.open("compileOptions");
        if let Some(source) = compatibility.source_compatibility {
            w.assign("sourceCompatibility", format!("JavaVersion.{}", source.constant()));
        }
        if let Some(target) = compatibility.target_compatibility {
            w.assign("targetCompatibility", format!("JavaVersion.{}", target.constant()));
        }
        if compatibility.core_library_desugaring_enabled {
            w.assign("isCoreLibraryDesugaringEnabled", true);
        }
        w.close();
    }

    if let Some(jvm) = compatibility.jvm_target {
        w.blank();
        w.open("kotlinOptions");
        w.assign("jvmTarget", quote(&jvm.jvm_target()));
        w.close();
    }

    w.blank();
    w.open("defaultConfig");
    w.assign("applicationId", quote(&identity.application_id));
    w.assign("minSdk", sdk.min_sdk);
    w.assign("targetSdk", sdk.target_sdk);
    if let Some(code) = default_config.version_code {
        w.assign("versionCode", code);
    }
    if let Some(name) = &default_config.version_name {
        w.assign("versionName", quote(name));
    }
    if let Some(multi_dex) = default_config.multi_dex_enabled {
        w.assign("multiDexEnabled", multi_dex);
    }
    w.close();

    if !descriptor.build_types().is_empty() {
        w.blank();
        w.open("buildTypes");
        for build_type in descriptor.build_types() {
            w.open(&format!("getByName({})", quote(&build_type.name)));
            if let Some(signing) = &build_type.signing_config {
                w.assign(
                    "signingConfig",
                    format!("signingConfigs.getByName({})", quote(signing)),
                );
            }
            if let Some(minify) = build_type.minify_enabled {
                w.assign("isMinifyEnabled", minify);
            }
            if let Some(shrink) = build_type.shrink_resources {
                w.assign("isShrinkResources", shrink);
            }
            w.close();
        }
        w.close();
    }

    w.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{Configuration, DependencyCoordinate, VersionSpec};
    use crate::descriptor::{BuildType, DefaultConfig, JavaVersion, LanguageCompatibility};
    use crate::plugins::{PluginReference, PluginSyntax};
    use proptest::prelude::*;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b"), r#""a\"b""#);
        assert_eq!(quote("$HOME\\x"), r#""\$HOME\\x""#);
        assert_eq!(quote("line\nnext"), r#""line\nnext""#);
    }

    #[test]
    fn test_minimal_layout() {
        let descriptor = BuildDescriptor::builder()
            .namespace("com.example.app")
            .application_id("com.example.app")
            .sdk(21, 34, 35)
            .build(&LoadOptions::default())
            .unwrap();

        assert_eq!(
            descriptor.serialize(),
            "android {\n    namespace = \"com.example.app\"\n    compileSdk = 35\n\n    defaultConfig {\n        applicationId = \"com.example.app\"\n        minSdk = 21\n        targetSdk = 34\n    }\n}\n"
        );
    }

    #[test]
    fn test_maven_repository_with_escapes() {
        let descriptor = BuildDescriptor::builder()
            .namespace("com.example.app")
            .application_id("com.example.app")
            .sdk(21, 34, 35)
            .repository(Repository::Maven {
                url: "https://repo.example.com/\"odd\"/$path".into(),
            })
            .build(&LoadOptions::default())
            .unwrap();

        let text = descriptor.serialize();
        assert!(text.contains("url = uri(\"https://repo.example.com/\\\"odd\\\"/\\$path\")"));
        assert_eq!(BuildDescriptor::load(&text).unwrap(), descriptor);
    }

    #[test]
    fn test_format_script_counts_dropped_comments() {
        let source = include_str!("../tests/fixtures/app.build.gradle.kts");
        let formatted = format_script(source, &LoadOptions::default()).unwrap();
        assert!(!formatted.unchanged);
        assert_eq!(formatted.dropped_comments, 5);
        assert_eq!(dsl::count_comments(&formatted.text).unwrap(), 0);

        let again = format_script(&formatted.text, &LoadOptions::default()).unwrap();
        assert!(again.unchanged);
        assert_eq!(again.dropped_comments, 0);
    }

    fn reverse_dns() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z][a-z0-9_]{0,8}", 2..4).prop_map(|parts| parts.join("."))
    }

    fn coordinate() -> impl Strategy<Value = DependencyCoordinate> {
        (
            prop::sample::select(Configuration::ALL.to_vec()),
            reverse_dns(),
            "[a-z][a-z0-9-]{0,10}",
            prop::option::of("[0-9]{1,2}\\.[0-9]{1,2}(\\.[0-9]{1,2})?(\\.\\+)?"),
            any::<bool>(),
        )
            .prop_map(|(configuration, group, artifact, version, platform)| {
                let platform = platform && version.is_some();
                let notation = match version {
                    Some(v) => format!("{}:{}:{}", group, artifact, v),
                    None => format!("{}:{}", group, artifact),
                };
                DependencyCoordinate::parse(configuration, &notation, platform).unwrap()
            })
    }

    fn build_type() -> impl Strategy<Value = BuildType> {
        (
            "[a-z][a-zA-Z0-9]{0,8}",
            prop::option::of("[a-z][a-zA-Z0-9 \"$]{0,8}"),
            prop::option::of(any::<bool>()),
            prop::option::of(any::<bool>()),
        )
            .prop_map(|(name, signing, minify, shrink)| BuildType {
                name,
                signing_config: signing,
                minify_enabled: minify,
                shrink_resources: shrink,
            })
    }

    fn descriptor() -> impl Strategy<Value = BuildDescriptor> {
        (
            (reverse_dns(), reverse_dns(), 1u32..=40, 0u32..=5, 0u32..=5),
            (prop::option::of(8u32..=21), any::<bool>(), any::<bool>()),
            (
                prop::option::of(1u32..100_000),
                prop::option::of("[0-9a-zA-Z .+\\-]{1,12}"),
                prop::option::of(any::<bool>()),
            ),
            prop::collection::vec(build_type(), 0..4),
            prop::collection::vec(coordinate(), 0..6),
            prop::option::of("[a-z./]{1,10}"),
            any::<bool>(),
        )
            .prop_map(
                |(
                    (namespace, app_id, min, target_delta, compile_delta),
                    (java, with_jvm, desugar),
                    (version_code, version_name, multi_dex),
                    build_types,
                    deps,
                    flutter,
                    kotlin_shorthand,
                )| {
                    let target = min + target_delta;
                    let compatibility = LanguageCompatibility {
                        source_compatibility: java.map(JavaVersion),
                        target_compatibility: java.map(JavaVersion),
                        jvm_target: java.filter(|_| with_jvm).map(JavaVersion),
                        core_library_desugaring_enabled: desugar,
                    };
                    let mut builder = BuildDescriptor::builder()
                        .plugin(PluginReference::id("com.android.application"))
                        .plugin(if kotlin_shorthand {
                            PluginReference::kotlin("android")
                        } else {
                            PluginReference::id("kotlin-android")
                        })
                        .namespace(namespace)
                        .application_id(app_id)
                        .sdk(min, target, target + compile_delta)
                        .compatibility(compatibility)
                        .default_config(DefaultConfig {
                            version_code,
                            version_name: version_name.filter(|n| !n.trim().is_empty()),
                            multi_dex_enabled: multi_dex,
                        })
                        .repository(Repository::Google)
                        .repository(Repository::MavenCentral);

                    let mut names = std::collections::HashSet::new();
                    for build_type in build_types {
                        if names.insert(build_type.name.clone()) {
                            builder = builder.build_type(build_type);
                        }
                    }
                    for dep in deps {
                        builder = builder.dependency(dep);
                    }
                    if let Some(source) = flutter {
                        builder = builder.flutter_source(source);
                    }
                    builder.build(&LoadOptions::default()).unwrap()
                },
            )
    }

    /// Printable ASCII plus the characters `quote` has to escape
    const ANY_TEXT: &str = "[ -~\\n\\t\\r]{0,10}";

    fn any_plugin() -> impl Strategy<Value = PluginReference> {
        (
            prop_oneof![
                Just("com.android.application".to_string()),
                ANY_TEXT,
                "org\\.jetbrains\\.kotlin\\.[ -~]{0,6}",
            ],
            any::<bool>(),
        )
            .prop_map(|(id, kotlin)| PluginReference {
                id,
                syntax: if kotlin {
                    PluginSyntax::Kotlin
                } else {
                    PluginSyntax::Id
                },
            })
    }

    fn any_version() -> impl Strategy<Value = VersionSpec> {
        let text = "[0-9a-z.+\\[\\](), :]{0,6}";
        prop_oneof![
            Just(VersionSpec::Managed),
            text.prop_map(VersionSpec::Exact),
            text.prop_map(VersionSpec::Range),
            text.prop_map(VersionSpec::Dynamic),
        ]
    }

    fn any_dependency() -> impl Strategy<Value = DependencyCoordinate> {
        (
            prop::sample::select(Configuration::ALL.to_vec()),
            prop_oneof![reverse_dns(), "[a-z.: \"-]{0,6}"],
            "[a-z.: \"-]{0,6}",
            any_version(),
            any::<bool>(),
        )
            .prop_map(|(configuration, group, artifact, version, platform)| {
                DependencyCoordinate {
                    configuration,
                    group,
                    artifact,
                    version,
                    platform,
                }
            })
    }

    fn any_build_type() -> impl Strategy<Value = BuildType> {
        (
            "[a-zA-Z0-9_]{0,6}",
            prop::option::of(ANY_TEXT),
            prop::option::of(any::<bool>()),
        )
            .prop_map(|(name, signing, minify)| BuildType {
                name,
                signing_config: signing,
                minify_enabled: minify,
                shrink_resources: None,
            })
    }

    fn any_builder() -> impl Strategy<Value = crate::descriptor::DescriptorBuilder> {
        (
            (
                prop::collection::vec(any_plugin(), 0..3),
                prop_oneof![reverse_dns(), ANY_TEXT],
                0u32..40,
                0u32..40,
                0u32..40,
            ),
            (
                prop::option::of(0u32..=25),
                prop::option::of(0u32..=25),
                prop::option::of(0u32..=25),
            ),
            (
                prop::option::of(0u32..3),
                prop::option::of(ANY_TEXT),
                prop::option::of(ANY_TEXT),
                prop::option::of(ANY_TEXT),
            ),
            prop::collection::vec(any_build_type(), 0..3),
            prop::collection::vec(any_dependency(), 0..3),
            prop::option::of(ANY_TEXT),
        )
            .prop_map(
                |(
                    (plugins, identity, min, target, compile),
                    (source, target_level, jvm),
                    (version_code, version_name, ndk, flutter),
                    build_types,
                    deps,
                    maven,
                )| {
                    let mut builder = BuildDescriptor::builder()
                        .namespace(identity.clone())
                        .application_id(identity)
                        .sdk(min, target, compile)
                        .compatibility(LanguageCompatibility {
                            source_compatibility: source.map(JavaVersion),
                            target_compatibility: target_level.map(JavaVersion),
                            jvm_target: jvm.map(JavaVersion),
                            core_library_desugaring_enabled: false,
                        })
                        .default_config(DefaultConfig {
                            version_code,
                            version_name,
                            multi_dex_enabled: None,
                        });
                    for plugin in plugins {
                        builder = builder.plugin(plugin);
                    }
                    if let Some(ndk) = ndk {
                        builder = builder.ndk_version(ndk);
                    }
                    if let Some(source) = flutter {
                        builder = builder.flutter_source(source);
                    }
                    for build_type in build_types {
                        builder = builder.build_type(build_type);
                    }
                    for dep in deps {
                        builder = builder.dependency(dep);
                    }
                    if let Some(url) = maven {
                        builder = builder.repository(Repository::Maven { url });
                    }
                    builder
                },
            )
    }

    proptest! {
        #[test]
        fn prop_built_descriptor_reloads(builder in any_builder()) {
            if let Ok(d) = builder.build(&LoadOptions::default()) {
                let loaded = BuildDescriptor::load(&d.serialize());
                prop_assert_eq!(loaded.ok(), Some(d));
            }
        }

        #[test]
        fn prop_load_serialize_roundtrip(d in descriptor()) {
            let text = d.serialize();
            let loaded = BuildDescriptor::load(&text).unwrap();
            prop_assert_eq!(&loaded, &d);
            prop_assert_eq!(loaded.serialize(), text);
        }
    }
}
