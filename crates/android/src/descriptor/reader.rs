//! Statement tree to [`DescriptorBuilder`]
//!
//! Reading is strict: a statement the model has no place for is rejected
//! rather than dropped, so re-serializing never silently loses content.

use super::{BuildType, DescriptorBuilder, FlutterBlock, JavaVersion, Repository};
use crate::dependency::{Configuration, DependencyCoordinate};
use crate::dsl::{Expr, Statement};
use crate::plugins::PluginReference;
use droidbuild_core::error::{Error, Result};
use std::collections::HashSet;

pub(super) fn read(statements: &[Statement]) -> Result<DescriptorBuilder> {
    let mut reader = Reader::default();

    for statement in statements {
        let (name, body) = nested(statement, "")?;
        match name.as_str() {
            "plugins" => reader.plugins(statement.line(), body)?,
            "android" => reader.android(statement.line(), body)?,
            "flutter" => reader.flutter(statement.line(), body)?,
            "dependencies" => reader.dependencies(statement.line(), body)?,
            "allprojects" => reader.allprojects(statement.line(), body)?,
            _ => return Err(unsupported(statement, "")),
        }
    }

    for section in ["android", "android.defaultConfig"] {
        if !reader.seen.contains(section) {
            return Err(Error::malformed(
                section,
                format!("Missing required section `{}`", section),
            ));
        }
    }

    Ok(reader.builder)
}

#[derive(Default)]
struct Reader {
    builder: DescriptorBuilder,
    seen: HashSet<String>,
}

impl Reader {
    /// Record a section or field; a second declaration is an error
    fn first(&mut self, field: &str, line: usize) -> Result<()> {
        if self.seen.insert(field.to_string()) {
            Ok(())
        } else {
            Err(Error::malformed(
                field,
                format!("line {}: `{}` is declared more than once", line, field),
            ))
        }
    }

    fn plugins(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("plugins", line)?;
        for statement in body {
            let plugin = match statement {
                Statement::Call {
                    callee,
                    args,
                    block: None,
                    ..
                } if callee.len() == 1 => match (callee[0].as_str(), args.as_slice()) {
                    ("id", [Expr::Str(id)]) if !id.trim().is_empty() => PluginReference::id(id),
                    ("kotlin", [Expr::Str(module)]) if !module.trim().is_empty() => {
                        PluginReference::kotlin(module)
                    }
                    _ => return Err(unsupported(statement, "plugins")),
                },
                _ => return Err(unsupported(statement, "plugins")),
            };
            self.builder.plugins.push(plugin);
        }
        Ok(())
    }

    fn android(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("android", line)?;
        for statement in body {
            match statement {
                Statement::Assign { target, value, line } => {
                    let field = format!("android.{}", target.join("."));
                    self.first(&field, *line)?;
                    match target.join(".").as_str() {
                        "namespace" => self.builder.namespace = Some(string(value, &field, *line)?),
                        "compileSdk" => self.builder.compile_sdk = Some(int(value, &field, *line)?),
                        "ndkVersion" => self.builder.ndk_version = Some(string(value, &field, *line)?),
                        _ => return Err(unsupported(statement, "android")),
                    }
                }
                Statement::Call { .. } => {
                    let (name, inner) = nested(statement, "android")?;
                    match name.as_str() {
                        "compileOptions" => self.compile_options(statement.line(), inner)?,
                        "kotlinOptions" => self.kotlin_options(statement.line(), inner)?,
                        "defaultConfig" => self.default_config(statement.line(), inner)?,
                        "buildTypes" => self.build_types(statement.line(), inner)?,
                        _ => return Err(unsupported(statement, "android")),
                    }
                }
            }
        }
        Ok(())
    }

    fn compile_options(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("android.compileOptions", line)?;
        for statement in body {
            let Statement::Assign { target, value, line } = statement else {
                return Err(unsupported(statement, "android.compileOptions"));
            };
            let field = format!("android.compileOptions.{}", target.join("."));
            self.first(&field, *line)?;
            let compatibility = &mut self.builder.compatibility;
            match target.join(".").as_str() {
                "sourceCompatibility" => {
                    compatibility.source_compatibility = Some(java_version(value, &field, *line)?)
                }
                "targetCompatibility" => {
                    compatibility.target_compatibility = Some(java_version(value, &field, *line)?)
                }
                "isCoreLibraryDesugaringEnabled" => {
                    compatibility.core_library_desugaring_enabled = boolean(value, &field, *line)?
                }
                _ => return Err(unsupported(statement, "android.compileOptions")),
            }
        }
        Ok(())
    }

    fn kotlin_options(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("android.kotlinOptions", line)?;
        for statement in body {
            match statement {
                Statement::Assign { target, value, line } if target.join(".") == "jvmTarget" => {
                    let field = "android.kotlinOptions.jvmTarget";
                    self.first(field, *line)?;
                    self.builder.compatibility.jvm_target = Some(jvm_target(value, field, *line)?);
                }
                _ => return Err(unsupported(statement, "android.kotlinOptions")),
            }
        }
        Ok(())
    }

    fn default_config(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("android.defaultConfig", line)?;
        for statement in body {
            let Statement::Assign { target, value, line } = statement else {
                return Err(unsupported(statement, "android.defaultConfig"));
            };
            let field = format!("android.defaultConfig.{}", target.join("."));
            self.first(&field, *line)?;
            let builder = &mut self.builder;
            match target.join(".").as_str() {
                "applicationId" => builder.application_id = Some(string(value, &field, *line)?),
                "minSdk" => builder.min_sdk = Some(int(value, &field, *line)?),
                "targetSdk" => builder.target_sdk = Some(int(value, &field, *line)?),
                "versionCode" => {
                    builder.default_config.version_code = Some(int(value, &field, *line)?)
                }
                "versionName" => {
                    builder.default_config.version_name = Some(string(value, &field, *line)?)
                }
                "multiDexEnabled" => {
                    builder.default_config.multi_dex_enabled = Some(boolean(value, &field, *line)?)
                }
                _ => return Err(unsupported(statement, "android.defaultConfig")),
            }
        }
        Ok(())
    }

    fn build_types(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("android.buildTypes", line)?;
        for statement in body {
            let name = match statement {
                Statement::Call {
                    callee,
                    args,
                    block: Some(_),
                    ..
                } if callee.len() == 1 => match (callee[0].as_str(), args.as_slice()) {
                    ("getByName" | "create", [Expr::Str(name)]) => name.clone(),
                    (name, []) => name.to_string(),
                    _ => return Err(unsupported(statement, "android.buildTypes")),
                },
                _ => return Err(unsupported(statement, "android.buildTypes")),
            };
            let Statement::Call { block: Some(inner), .. } = statement else {
                return Err(unsupported(statement, "android.buildTypes"));
            };
            let build_type = self.build_type(name, inner)?;
            self.builder.build_types.push(build_type);
        }
        Ok(())
    }

    fn build_type(&mut self, name: String, body: &[Statement]) -> Result<BuildType> {
        let parent = format!("android.buildTypes.{}", name);
        let mut build_type = BuildType::new(name);
        for statement in body {
            let Statement::Assign { target, value, line } = statement else {
                return Err(unsupported(statement, &parent));
            };
            let field = format!("{}.{}", parent, target.join("."));
            self.first(&field, *line)?;
            match target.join(".").as_str() {
                "signingConfig" => {
                    build_type.signing_config = Some(signing_reference(value, &field, *line)?)
                }
                "isMinifyEnabled" => build_type.minify_enabled = Some(boolean(value, &field, *line)?),
                "isShrinkResources" => {
                    build_type.shrink_resources = Some(boolean(value, &field, *line)?)
                }
                _ => return Err(unsupported(statement, &parent)),
            }
        }
        Ok(build_type)
    }

    fn flutter(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("flutter", line)?;
        let mut source = None;
        for statement in body {
            match statement {
                Statement::Assign { target, value, line } if target.join(".") == "source" => {
                    self.first("flutter.source", *line)?;
                    source = Some(string(value, "flutter.source", *line)?);
                }
                _ => return Err(unsupported(statement, "flutter")),
            }
        }
        let source = source.ok_or_else(|| {
            Error::malformed("flutter.source", format!("line {}: flutter block without `source`", line))
        })?;
        self.builder.flutter = Some(FlutterBlock { source });
        Ok(())
    }

    fn dependencies(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("dependencies", line)?;
        for statement in body {
            let Statement::Call {
                callee,
                args,
                block: None,
                line,
            } = statement
            else {
                return Err(unsupported(statement, "dependencies"));
            };
            let configuration = match callee.as_slice() {
                [name] => Configuration::from_name(name),
                _ => None,
            }
            .ok_or_else(|| unsupported(statement, "dependencies"))?;

            let (notation, platform) = match args.as_slice() {
                [Expr::Str(notation)] => (notation, false),
                [Expr::Call { callee, args }]
                    if callee.len() == 1 && callee[0] == "platform" =>
                {
                    match args.as_slice() {
                        [Expr::Str(notation)] => (notation, true),
                        _ => return Err(unsupported(statement, "dependencies")),
                    }
                }
                _ => return Err(unsupported(statement, "dependencies")),
            };

            let dependency = DependencyCoordinate::parse(configuration, notation, platform)
                .map_err(|e| e.with_context(format!("line {}", line)))?;
            self.builder.dependencies.push(dependency);
        }
        Ok(())
    }

    fn allprojects(&mut self, line: usize, body: &[Statement]) -> Result<()> {
        self.first("allprojects", line)?;
        for statement in body {
            let (name, inner) = nested(statement, "allprojects")?;
            if name != "repositories" {
                return Err(unsupported(statement, "allprojects"));
            }
            self.first("allprojects.repositories", statement.line())?;
            for repository in inner {
                let repository = read_repository(repository)?;
                self.builder.repositories.push(repository);
            }
        }
        Ok(())
    }
}

fn read_repository(statement: &Statement) -> Result<Repository> {
    const PARENT: &str = "allprojects.repositories";
    let Statement::Call {
        callee,
        args,
        block,
        ..
    } = statement
    else {
        return Err(unsupported(statement, PARENT));
    };
    if callee.len() != 1 {
        return Err(unsupported(statement, PARENT));
    }

    let repository = match (callee[0].as_str(), args.as_slice(), block) {
        ("google", [], None) => Repository::Google,
        ("mavenCentral", [], None) => Repository::MavenCentral,
        ("gradlePluginPortal", [], None) => Repository::GradlePluginPortal,
        ("mavenLocal", [], None) => Repository::MavenLocal,
        ("maven", [Expr::Str(url)], None) => Repository::Maven { url: url.clone() },
        ("maven", [], Some(body)) => match body.as_slice() {
            [Statement::Assign { target, value, line }] if target.join(".") == "url" => {
                let field = format!("{}.maven.url", PARENT);
                let url = match value {
                    Expr::Call { callee, args } if callee.len() == 1 && callee[0] == "uri" => {
                        match args.as_slice() {
                            [inner] => string(inner, &field, *line)?,
                            _ => return Err(unsupported(statement, PARENT)),
                        }
                    }
                    other => string(other, &field, *line)?,
                };
                Repository::Maven { url }
            }
            _ => return Err(unsupported(statement, PARENT)),
        },
        _ => return Err(unsupported(statement, PARENT)),
    };
    Ok(repository)
}

/// Name and body of a plain block statement (`name { ... }`)
fn nested<'s>(statement: &'s Statement, parent: &str) -> Result<(String, &'s [Statement])> {
    match statement {
        Statement::Call {
            callee,
            args,
            block: Some(body),
            ..
        } if args.is_empty() => Ok((callee.join("."), body.as_slice())),
        _ => Err(unsupported(statement, parent)),
    }
}

fn unsupported(statement: &Statement, parent: &str) -> Error {
    let location = if parent.is_empty() {
        "at top level".to_string()
    } else {
        format!("in `{}`", parent)
    };
    let field = if parent.is_empty() {
        statement.name()
    } else {
        format!("{}.{}", parent, statement.name())
    };
    Error::malformed(
        field,
        format!(
            "line {}: unsupported statement `{}` {}",
            statement.line(),
            statement.name(),
            location
        ),
    )
}

fn type_error(field: &str, line: usize, expected: &str, value: &Expr) -> Error {
    Error::malformed(
        field,
        format!("line {}: expected {}, found {}", line, expected, value.describe()),
    )
}

fn string(value: &Expr, field: &str, line: usize) -> Result<String> {
    match value {
        Expr::Str(s) => Ok(s.clone()),
        other => Err(type_error(field, line, "a string", other)),
    }
}

fn int(value: &Expr, field: &str, line: usize) -> Result<u32> {
    match value {
        Expr::Int(i) => u32::try_from(*i).map_err(|_| {
            Error::malformed(field, format!("line {}: {} is out of range", line, i))
        }),
        other => Err(type_error(field, line, "a non-negative integer", other)),
    }
}

fn boolean(value: &Expr, field: &str, line: usize) -> Result<bool> {
    match value {
        Expr::Bool(b) => Ok(*b),
        other => Err(type_error(field, line, "true or false", other)),
    }
}

/// `JavaVersion.VERSION_17`
fn java_version(value: &Expr, field: &str, line: usize) -> Result<JavaVersion> {
    match value {
        Expr::Path(path) => match path.as_slice() {
            [class, constant] if class == "JavaVersion" => JavaVersion::from_constant(constant)
                .ok_or_else(|| type_error(field, line, "a JavaVersion constant", value)),
            _ => Err(type_error(field, line, "a JavaVersion constant", value)),
        },
        other => Err(type_error(field, line, "a JavaVersion constant", other)),
    }
}

/// `"17"` or `JavaVersion.VERSION_17.toString()`
fn jvm_target(value: &Expr, field: &str, line: usize) -> Result<JavaVersion> {
    const EXPECTED: &str = "a JVM target such as \"17\"";
    match value {
        Expr::Str(s) => {
            JavaVersion::from_jvm_target(s).ok_or_else(|| type_error(field, line, EXPECTED, value))
        }
        Expr::Call { callee, args } if args.is_empty() => match callee.as_slice() {
            [class, constant, method] if class == "JavaVersion" && method == "toString" => {
                JavaVersion::from_constant(constant)
                    .ok_or_else(|| type_error(field, line, EXPECTED, value))
            }
            _ => Err(type_error(field, line, EXPECTED, value)),
        },
        other => Err(type_error(field, line, EXPECTED, other)),
    }
}

/// `signingConfigs.getByName("name")`
fn signing_reference(value: &Expr, field: &str, line: usize) -> Result<String> {
    const EXPECTED: &str = "signingConfigs.getByName(\"<name>\")";
    match value {
        Expr::Call { callee, args } => match (callee.as_slice(), args.as_slice()) {
            ([receiver, method], [Expr::Str(name)])
                if receiver == "signingConfigs" && method == "getByName" && !name.is_empty() =>
            {
                Ok(name.clone())
            }
            _ => Err(type_error(field, line, EXPECTED, value)),
        },
        other => Err(type_error(field, line, EXPECTED, other)),
    }
}
