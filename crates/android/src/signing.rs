//! Signing configuration table
//!
//! Build types only reference signing configs by name. The table those names
//! resolve against lives outside the script: `[signing.<name>]` sections of
//! the tool configuration, plus the `debug` config the Android Gradle plugin
//! always generates.

use droidbuild_core::config::SigningEntry;
use droidbuild_core::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Name of the signing config the Android Gradle plugin provides implicitly
pub const DEBUG_SIGNING_CONFIG: &str = "debug";

/// A named credential set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningConfig {
    pub name: String,
    pub store_file: Option<String>,
    pub key_alias: Option<String>,
    pub store_password_env: Option<String>,
    pub key_password_env: Option<String>,
}

impl SigningConfig {
    /// Build a table entry from its configuration section
    pub fn from_entry(name: &str, entry: &SigningEntry) -> Self {
        Self {
            name: name.to_string(),
            store_file: entry.store_file.clone(),
            key_alias: entry.key_alias.clone(),
            store_password_env: entry.store_password_env.clone(),
            key_password_env: entry.key_password_env.clone(),
        }
    }

    /// The Android Gradle plugin's generated debug config
    pub fn agp_debug() -> Self {
        Self {
            name: DEBUG_SIGNING_CONFIG.to_string(),
            store_file: Some("~/.android/debug.keystore".to_string()),
            key_alias: Some("androiddebugkey".to_string()),
            store_password_env: None,
            key_password_env: None,
        }
    }

    /// Whether this is the development-only debug identity
    pub fn is_debug(&self) -> bool {
        self.name == DEBUG_SIGNING_CONFIG
    }
}

/// Signing configs by name
#[derive(Debug, Clone, Default)]
pub struct SigningTable {
    entries: BTreeMap<String, SigningConfig>,
}

impl SigningTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table from `[signing.<name>]` configuration sections
    pub fn from_config(entries: &BTreeMap<String, SigningEntry>) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(name, entry)| (name.clone(), SigningConfig::from_entry(name, entry)))
                .collect(),
        }
    }

    /// Add the implicit `debug` config unless the table already defines one
    pub fn with_agp_debug(mut self) -> Self {
        self.entries
            .entry(DEBUG_SIGNING_CONFIG.to_string())
            .or_insert_with(SigningConfig::agp_debug);
        self
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, config: SigningConfig) {
        self.entries.insert(config.name.clone(), config);
    }

    /// Look up an entry
    pub fn get(&self, name: &str) -> Option<&SigningConfig> {
        self.entries.get(name)
    }

    /// Look up an entry, failing with `UnknownSigningConfig`
    pub fn resolve(&self, name: &str) -> Result<&SigningConfig> {
        self.get(name).ok_or_else(|| {
            Error::unknown_signing_config(name)
                .with_context(format!("Known signing configs: {}", self.names().join(", ")))
        })
    }

    /// Defined names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
