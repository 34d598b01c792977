//! Application configuration loaded from file and environment.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Directory under the user's config root holding our files.
pub const CONFIG_DIR: &str = "metro-pids";

const DEFAULT_CONFIG: &str = r#"# Metro-PIDS display server configuration.
# Values here are overridden by PIDS_* environment variables,
# e.g. PIDS_PORT=9100.

# Address the HTTP API binds to.
host = "127.0.0.1"
port = 9001

# Geometry applied to displays opened without an explicit size.
default_width = 1900
default_height = 600

# Updates buffered per display feed before deliveries are dropped.
feed_capacity = 16
"#;

/// Runtime configuration for the server and core defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP API binds to.
    pub host: String,
    /// Port the HTTP API binds to.
    pub port: u16,
    /// Width applied to displays opened without an explicit size.
    pub default_width: u32,
    /// Height applied to displays opened without an explicit size.
    pub default_height: u32,
    /// Updates buffered per display feed before deliveries are dropped.
    pub feed_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9001,
            default_width: 1900,
            default_height: 600,
            feed_capacity: 16,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location plus environment.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load configuration from an explicit file path plus environment.
    ///
    /// A missing file is fine; `PIDS_*` environment variables override
    /// file values either way.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Config::builder()
            .add_source(
                File::from(path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix("PIDS"))
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        settings
            .try_deserialize::<AppConfig>()
            .context("failed to parse configuration")
    }
}

/// Default path of the configuration file under the user's config dir.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write a commented default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = default_config_path();
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, DEFAULT_CONFIG)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("nope.toml"))?;
        assert_eq!(config.port, 9001);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.default_width, 1900);
        assert_eq!(config.default_height, 600);
        assert_eq!(config.feed_capacity, 16);
        Ok(())
    }

    #[test]
    fn partial_file_overrides_only_what_it_names() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = 9100\ndefault_width = 1280\n")?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.port, 9100);
        assert_eq!(config.default_width, 1280);
        assert_eq!(config.default_height, 600);
        Ok(())
    }

    #[test]
    fn default_template_parses_back_to_the_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, DEFAULT_CONFIG)?;

        let config = AppConfig::load_from(&path)?;
        let defaults = AppConfig::default();
        assert_eq!(config.port, defaults.port);
        assert_eq!(config.host, defaults.host);
        assert_eq!(config.feed_capacity, defaults.feed_capacity);
        Ok(())
    }
}
