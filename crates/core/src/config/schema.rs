//! Configuration schema definitions
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Signing table, keyed by signing config name
    #[serde(default)]
    pub signing: BTreeMap<String, SigningEntry>,

    #[serde(default)]
    pub lint: LintConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Host toolchain capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Highest Java/JVM target the installed JDK can produce
    #[serde(default = "default_max_jvm_target")]
    pub max_jvm_target: u32,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            max_jvm_target: default_max_jvm_target(),
        }
    }
}

fn default_max_jvm_target() -> u32 {
    21
}

/// Plugin ids accepted in addition to the built-in registry
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PluginsConfig {
    #[serde(default)]
    pub known: Vec<String>,
}

/// One entry of the external signing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SigningEntry {
    /// Keystore path
    #[serde(default)]
    pub store_file: Option<String>,

    /// Key alias inside the keystore
    #[serde(default)]
    pub key_alias: Option<String>,

    /// Environment variable holding the store password
    #[serde(default)]
    pub store_password_env: Option<String>,

    /// Environment variable holding the key password
    #[serde(default)]
    pub key_password_env: Option<String>,
}

/// Lint switches
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LintConfig {
    /// Do not warn when a release variant is signed with the debug config
    #[serde(default)]
    pub allow_debug_signed_release: bool,

    /// Treat warnings as errors
    #[serde(default)]
    pub deny_warnings: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
    /// Include the event target in each line
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            show_target: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
