//! Structured logging for droidbuild
//!
//! Installs a `tracing` subscriber with an `EnvFilter` (`RUST_LOG` wins over
//! the configured level) and either a compact or JSON formatter. Logs go to
//! stderr so command output on stdout stays machine-readable.

#![warn(missing_docs)]

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize with custom configuration
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.show_target)
                    .compact(),
            )
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.log_level,
        "Logging initialized"
    );

    Ok(())
}

/// Map `-v` repetitions onto a filter level, starting from `base`
pub fn level_for_verbosity(base: &str, verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => base.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Include the event target in each line
    pub show_target: bool,
    /// Emit JSON lines instead of compact text
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            show_target: false,
            json: false,
        }
    }
}
