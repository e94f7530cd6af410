//! droidbuild CLI
//!
//! Checks, lints, formats and builds Android module build scripts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use droidbuild_android::gradle::{self, ArtifactKind, BuildExecutor, GradleExecutor};
use droidbuild_android::lint::{lint, LintContext};
use droidbuild_android::serialize::format_script;
use droidbuild_android::{BuildDescriptor, LoadOptions, PluginRegistry, SigningTable};
use droidbuild_cli::output::{format_count, format_entry, print_report, Status};
use droidbuild_core::config::Config;
use droidbuild_core::error::{exit_codes, Error, ResultExt};
use droidbuild_telemetry::{level_for_verbosity, TelemetryConfig};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Where a module script usually lives, relative to the working directory
const SCRIPT_CANDIDATES: [&str; 3] = [
    "android/app/build.gradle.kts",
    "app/build.gradle.kts",
    "build.gradle.kts",
];

#[derive(Parser)]
#[command(name = "droidbuild")]
#[command(about = "Check, lint, format and build Android module build scripts")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Module build script (defaults to android/app/build.gradle.kts)
    #[arg(short, long, global = true, env = "DROIDBUILD_SCRIPT")]
    script: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the script and run every check
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report errors and warnings without stopping at the first one
    Lint {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the script in canonical form
    Fmt {
        /// Check only, don't modify
        #[arg(long)]
        check: bool,

        /// Rewrite even though comments will be lost
        #[arg(long)]
        force: bool,
    },

    /// List declared dependencies
    Deps {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a signing config by name
    Signing {
        /// Signing config name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the loaded descriptor
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a variant with the Gradle wrapper
    Build {
        /// Build variant
        #[arg(long, default_value = "debug")]
        variant: String,
        /// Build bundle (AAB) instead of APK
        #[arg(long)]
        bundle: bool,
        /// Directory holding gradlew (found above the script by default)
        #[arg(long)]
        project_dir: Option<PathBuf>,
    },
}

/// Shared state for every command
struct Context {
    config: Config,
    script: PathBuf,
    quiet: bool,
}

impl Context {
    fn read(&self) -> droidbuild_core::Result<String> {
        if !self.script.is_file() {
            return Err(Error::file_not_found(&self.script)
                .with_suggestion("Pass --script or run from the Flutter project root"));
        }
        std::fs::read_to_string(&self.script)
            .map_err(Error::from)
            .context(format!("Failed to read {}", self.script.display()))
    }

    fn options(&self) -> LoadOptions {
        LoadOptions::from(&self.config.schema.toolchain)
    }

    fn parse(&self, source: &str) -> droidbuild_core::Result<BuildDescriptor> {
        BuildDescriptor::load_with(source, &self.options())
    }

    fn load(&self) -> droidbuild_core::Result<BuildDescriptor> {
        self.parse(&self.read()?)
    }

    fn registry(&self) -> PluginRegistry {
        PluginRegistry::builtin().with_known(self.config.schema.plugins.known.iter().cloned())
    }

    fn signing(&self) -> SigningTable {
        SigningTable::from_config(&self.config.schema.signing).with_agp_debug()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => std::process::exit(report_error(&e, false)),
    };

    droidbuild_telemetry::init_with_config(TelemetryConfig {
        log_level: level_for_verbosity(&config.schema.logging.level, cli.verbose, cli.quiet),
        show_target: config.schema.logging.show_target,
        json: config.schema.logging.json,
    })?;

    if !cli.quiet {
        for warning in &config.warnings {
            Status::warning(&format_entry(warning));
        }
    }

    let script = cli.script.unwrap_or_else(default_script);
    tracing::debug!(script = %script.display(), "Using build script");

    let ctx = Context {
        config,
        script,
        quiet: cli.quiet,
    };

    let exit_code = match cli.command {
        Commands::Check { json } => run_check(&ctx, json)?,
        Commands::Lint { json } => run_lint(&ctx, json)?,
        Commands::Fmt { check, force } => run_fmt(&ctx, check, force)?,
        Commands::Deps { json } => run_deps(&ctx, json)?,
        Commands::Signing { name, json } => run_signing(&ctx, &name, json)?,
        Commands::Show { json } => run_show(&ctx, json)?,
        Commands::Build {
            variant,
            bundle,
            project_dir,
        } => run_build(&ctx, &variant, bundle, project_dir),
    };

    std::process::exit(exit_code);
}

fn default_script() -> PathBuf {
    SCRIPT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .unwrap_or_else(|| PathBuf::from(SCRIPT_CANDIDATES[0]))
}

/// Print an error and return its exit code
fn report_error(err: &Error, json: bool) -> i32 {
    if json {
        match serde_json::to_string_pretty(&err.to_report()) {
            Ok(report) => println!("{}", report),
            Err(_) => Status::error(&err.to_string()),
        }
    } else {
        Status::error(&err.to_string());
    }
    err.exit_code()
}

fn run_check(ctx: &Context, json: bool) -> Result<i32> {
    let descriptor = match ctx.load() {
        Ok(d) => d,
        Err(e) => return Ok(report_error(&e, json)),
    };

    if let Err(e) = descriptor.validate(&ctx.registry(), &ctx.signing()) {
        return Ok(report_error(&e, json));
    }

    if json {
        let summary = serde_json::json!({
            "valid": true,
            "script": ctx.script.display().to_string(),
            "applicationId": descriptor.identity().application_id,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !ctx.quiet {
        Status::success(&format!("{} is valid", ctx.script.display()));
    }
    Ok(exit_codes::SUCCESS)
}

fn run_lint(ctx: &Context, json: bool) -> Result<i32> {
    let descriptor = match ctx.load() {
        Ok(d) => d,
        Err(e) => return Ok(report_error(&e, json)),
    };

    let registry = ctx.registry();
    let signing = ctx.signing();
    let settings = &ctx.config.schema.lint;
    let mut result = lint(
        &descriptor,
        &LintContext {
            registry: &registry,
            signing: &signing,
            allow_debug_signed_release: settings.allow_debug_signed_release,
        },
    );
    if settings.deny_warnings {
        result = result.deny_warnings();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !ctx.quiet || !result.is_valid() {
        Status::header(&format!("Lint: {}", ctx.script.display()));
        print_report(&result);
    }

    Ok(if result.is_valid() {
        exit_codes::SUCCESS
    } else {
        exit_codes::VALIDATION_ERROR
    })
}

fn run_fmt(ctx: &Context, check: bool, force: bool) -> Result<i32> {
    let source = match ctx.read() {
        Ok(s) => s,
        Err(e) => return Ok(report_error(&e, false)),
    };
    let formatted = match format_script(&source, &ctx.options()) {
        Ok(f) => f,
        Err(e) => return Ok(report_error(&e, false)),
    };

    if formatted.unchanged {
        if !ctx.quiet {
            Status::success(&format!("{} is already formatted", ctx.script.display()));
        }
        return Ok(exit_codes::SUCCESS);
    }

    if check {
        Status::error(&format!("{} is not in canonical form", ctx.script.display()));
        return Ok(exit_codes::FAILURE);
    }

    if formatted.dropped_comments > 0 && !force {
        Status::error(&format!(
            "Formatting would drop {}",
            format_count(formatted.dropped_comments, "comment", "comments")
        ));
        println!("  Re-run with --force to rewrite {} anyway", ctx.script.display());
        return Ok(exit_codes::FAILURE);
    }
    if formatted.dropped_comments > 0 {
        Status::warning(&format!(
            "Dropping {} from {}",
            format_count(formatted.dropped_comments, "comment", "comments"),
            ctx.script.display()
        ));
    }

    std::fs::write(&ctx.script, formatted.text)?;
    if !ctx.quiet {
        Status::success(&format!("Formatted {}", ctx.script.display()));
    }
    Ok(exit_codes::SUCCESS)
}

fn run_deps(ctx: &Context, json: bool) -> Result<i32> {
    let descriptor = match ctx.load() {
        Ok(d) => d,
        Err(e) => return Ok(report_error(&e, json)),
    };
    if let Err(e) = descriptor.validate_dependencies() {
        return Ok(report_error(&e, json));
    }

    let deps = descriptor.dependencies();
    if json {
        println!("{}", serde_json::to_string_pretty(deps)?);
        return Ok(exit_codes::SUCCESS);
    }

    Status::header(&format!("Dependencies of {}", descriptor.identity().application_id));
    for dep in deps {
        let version = match dep.version.as_str() {
            Some(v) => v.to_string(),
            None => "(managed)".dimmed().to_string(),
        };
        let platform = if dep.platform { " [platform]" } else { "" };
        println!(
            "  {:<26} {}:{} {}{}",
            dep.configuration.to_string().cyan(),
            dep.group,
            dep.artifact,
            version,
            platform.dimmed()
        );
    }
    println!();
    Status::info(&format_count(deps.len(), "dependency", "dependencies"));
    Ok(exit_codes::SUCCESS)
}

fn run_signing(ctx: &Context, name: &str, json: bool) -> Result<i32> {
    let descriptor = match ctx.load() {
        Ok(d) => d,
        Err(e) => return Ok(report_error(&e, json)),
    };
    let table = ctx.signing();
    let config = match descriptor.resolve_signing_config(name, &table) {
        Ok(c) => c,
        Err(e) => return Ok(report_error(&e, json)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(exit_codes::SUCCESS);
    }

    Status::header(&format!("Signing config: {}", config.name));
    let unset = || "(unset)".dimmed().to_string();
    for (label, value) in [
        ("store file", &config.store_file),
        ("key alias", &config.key_alias),
        ("store password env", &config.store_password_env),
        ("key password env", &config.key_password_env),
    ] {
        println!("  {:<20} {}", label, value.clone().unwrap_or_else(unset));
    }

    let users: Vec<&str> = descriptor
        .build_types()
        .iter()
        .filter(|bt| bt.signing_config.as_deref() == Some(name))
        .map(|bt| bt.name.as_str())
        .collect();
    if !users.is_empty() {
        println!("  {:<20} {}", "used by", users.join(", "));
    }
    if config.is_debug() {
        Status::warning("The debug config is for development builds only");
    }
    Ok(exit_codes::SUCCESS)
}

fn run_show(ctx: &Context, json: bool) -> Result<i32> {
    let descriptor = match ctx.load() {
        Ok(d) => d,
        Err(e) => return Ok(report_error(&e, json)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(exit_codes::SUCCESS);
    }

    let identity = descriptor.identity();
    let sdk = descriptor.sdk();
    let compat = descriptor.compatibility();
    let defaults = descriptor.default_config();

    Status::header(&identity.application_id);
    let rows = [
        ("namespace", identity.namespace.clone()),
        (
            "sdk",
            format!(
                "min {} / target {} / compile {}",
                sdk.min_sdk, sdk.target_sdk, sdk.compile_sdk
            ),
        ),
        (
            "java",
            compat
                .target_compatibility
                .or(compat.jvm_target)
                .map_or_else(|| "default".to_string(), |v| v.to_string()),
        ),
        (
            "version",
            match (&defaults.version_name, defaults.version_code) {
                (Some(name), Some(code)) => format!("{} ({})", name, code),
                (Some(name), None) => name.clone(),
                (None, Some(code)) => format!("({})", code),
                (None, None) => "unset".to_string(),
            },
        ),
        (
            "plugins",
            descriptor
                .plugins()
                .iter()
                .map(|p| p.id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        (
            "build types",
            descriptor
                .build_types()
                .iter()
                .map(|bt| bt.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        (
            "flutter",
            descriptor
                .flutter()
                .map_or_else(|| "none".to_string(), |f| f.source.clone()),
        ),
        (
            "dependencies",
            descriptor.dependencies().len().to_string(),
        ),
        (
            "repositories",
            descriptor
                .repositories()
                .iter()
                .map(|r| r.declaration())
                .collect::<Vec<_>>()
                .join(", "),
        ),
    ];
    for (label, value) in rows {
        println!("  {:<14} {}", label.bold(), value);
    }
    Ok(exit_codes::SUCCESS)
}

fn run_build(ctx: &Context, variant: &str, bundle: bool, project_dir: Option<PathBuf>) -> i32 {
    let descriptor = match ctx.load() {
        Ok(d) => d,
        Err(e) => return report_error(&e, false),
    };
    if let Err(e) = descriptor.validate(&ctx.registry(), &ctx.signing()) {
        return report_error(&e, false);
    }

    let project_dir = project_dir
        .or_else(|| gradle::locate_project_dir(&ctx.script))
        .unwrap_or_else(|| {
            ctx.script
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        });

    let artifact = if bundle {
        ArtifactKind::Bundle
    } else {
        ArtifactKind::Apk
    };
    if !ctx.quiet {
        Status::info(&format!(
            "Running {} in {}",
            gradle::task_name(variant, artifact),
            project_dir.display()
        ));
    }

    let executor = GradleExecutor::new(project_dir).streaming(!ctx.quiet);
    match executor.execute(&descriptor, variant, artifact) {
        Ok(outcome) => {
            if !ctx.quiet {
                Status::success(&format!("{} succeeded", outcome.task));
            }
            exit_codes::SUCCESS
        }
        Err(e) => report_error(&e, false),
    }
}
