//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result, ResultExt};
use crate::validation::{validate_config_keys, ValidationError};
use std::path::{Path, PathBuf};

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed settings
    pub schema: ConfigSchema,
    /// File the settings came from, if any
    pub path: Option<PathBuf>,
    /// Non-fatal findings (unknown keys)
    pub warnings: Vec<ValidationError>,
}

impl Config {
    /// Load configuration from an explicit path, a discovered file, or defaults.
    ///
    /// An explicit path that does not exist is an error; a missing discovered
    /// file just means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(Path::new(".")),
        };

        match config_path {
            Some(p) => Self::from_file(&p),
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(Error::from)
            .context(format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::from_toml(&content)
            .context(format!("Failed to parse config file {}", path.display()))?;
        config.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let keys = validate_config_keys(&table);
        for warning in keys.warnings() {
            tracing::warn!(key = %warning.field, "{}", warning.message);
        }

        let schema: ConfigSchema = toml::from_str(content)?;
        if schema.toolchain.max_jvm_target < 8 {
            return Err(Error::new(
                crate::ErrorCode::InvalidConfigValue,
                format!(
                    "toolchain.max_jvm_target must be at least 8, got {}",
                    schema.toolchain.max_jvm_target
                ),
            )
            .with_field("toolchain.max_jvm_target"));
        }

        Ok(Self {
            schema,
            path: None,
            warnings: keys.warnings().to_vec(),
        })
    }
}

/// Find configuration file in standard locations under `root`
fn find_config_file(root: &Path) -> Option<PathBuf> {
    let candidates = [
        ".droidbuild.toml",
        "droidbuild.toml",
        ".config/droidbuild.toml",
    ];

    candidates
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert_eq!(config.schema.toolchain.max_jvm_target, 21);
        assert!(config.schema.signing.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let config = Config::from_toml(
            r#"
            [toolchain]
            max_jvm_target = 17

            [plugins]
            known = ["com.example.custom"]

            [signing.release]
            store_file = "keys/upload.jks"
            key_alias = "upload"
            store_password_env = "UPLOAD_STORE_PASSWORD"
            "#,
        )
        .unwrap();

        assert_eq!(config.schema.toolchain.max_jvm_target, 17);
        assert_eq!(config.schema.plugins.known, vec!["com.example.custom"]);
        let release = &config.schema.signing["release"];
        assert_eq!(release.key_alias.as_deref(), Some("upload"));
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_logging_section() {
        let config = Config::from_toml("[logging]\nlevel = \"info\"\njson = true\n").unwrap();
        assert_eq!(config.schema.logging.level, "info");
        assert!(config.schema.logging.json);
        assert!(!config.schema.logging.show_target);
        assert!(config.warnings.is_empty());

        let defaults = Config::default().schema.logging;
        assert_eq!(defaults.level, "warn");
        assert!(!defaults.json);
    }

    #[test]
    fn test_unknown_key_is_warning() {
        let config = Config::from_toml("[mystery]\nvalue = 1\n").unwrap();
        assert_eq!(config.warnings.len(), 1);
        assert_eq!(config.warnings[0].field, "mystery");
    }

    #[test]
    fn test_rejects_tiny_jvm_target() {
        let err = Config::from_toml("[toolchain]\nmax_jvm_target = 6\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }

    #[test]
    fn test_parse_error() {
        let err = Config::from_toml("[toolchain\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/droidbuild.toml"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("droidbuild.toml");
        std::fs::write(&path, "[lint]\nallow_debug_signed_release = true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.schema.lint.allow_debug_signed_release);
        assert_eq!(config.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_discovery_in_dot_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".config")).unwrap();
        std::fs::write(dir.path().join(".config/droidbuild.toml"), "").unwrap();

        let found = find_config_file(dir.path()).unwrap();
        assert!(found.ends_with(".config/droidbuild.toml"));
    }
}
