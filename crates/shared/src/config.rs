//! Configuration management for the AniDB client.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application name used for the platform cache directory
pub const APP_NAME: &str = "simpleanidb";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// AniDB client settings
    #[serde(default)]
    pub anidb: AnidbConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// AniDB client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnidbConfig {
    /// Directory holding the cached title index (None = platform cache dir)
    pub cache_dir: Option<PathBuf>,

    /// Download the title index on first search when it is missing
    pub auto_download: bool,

    /// Default display language for titles
    pub lang: String,

    /// Client name registered with AniDB
    pub client_name: String,

    /// Client version registered with AniDB
    pub client_version: u32,

    /// HTTP API endpoint
    pub api_url: String,

    /// Bulk title index URL
    pub titles_url: String,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for AnidbConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            auto_download: true,
            lang: "en".to_string(),
            client_name: "adbahttp".to_string(),
            client_version: 100,
            api_url: "http://api.anidb.net:9001/httpapi".to_string(),
            titles_url: "http://anidb.net/api/anime-titles.xml.gz".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: false,
            json_format: false,
        }
    }
}

impl AnidbConfig {
    /// Configuration pointing at an explicit cache directory
    pub fn with_cache_dir(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            cache_dir: Some(cache_dir.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Platform cache directory used when none is configured
    pub fn default_cache_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.cache_dir().to_path_buf())
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the log directory, resolved against the cache directory when relative
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            return log_path.to_path_buf();
        }
        match self
            .anidb
            .cache_dir
            .clone()
            .or_else(AnidbConfig::default_cache_dir)
        {
            Some(base) => base.join(log_path),
            None => log_path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.anidb.lang, "en");
        assert!(config.anidb.auto_download);
        assert_eq!(config.anidb.client_name, "adbahttp");
        assert_eq!(config.anidb.client_version, 100);
        assert_eq!(config.anidb.cache_dir, None);
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut original_config = Config::default();
        original_config.anidb.cache_dir = Some(temp_dir.path().join("cache"));
        original_config.anidb.lang = "x-jat".to_string();
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.anidb.lang, "x-jat");
        assert_eq!(loaded_config.anidb.cache_dir, original_config.anidb.cache_dir);
        assert_eq!(loaded_config.anidb.api_url, original_config.anidb.api_url);

        Ok(())
    }

    #[test]
    fn test_partial_config_uses_defaults() -> Result<()> {
        let config: Config = toml::from_str("[anidb]\nauto_download = false\n")?;
        assert!(!config.anidb.auto_download);
        assert_eq!(config.anidb.lang, "en");
        assert_eq!(config.logging.default_level, "info");
        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() -> Result<()> {
        let config = Config::from_file("nonexistent.toml")?;
        assert_eq!(config.anidb.lang, "en");
        Ok(())
    }

    #[test]
    fn test_log_dir_resolution() {
        let mut config = Config::default();
        config.anidb.cache_dir = Some(PathBuf::from("/tmp/anidb"));
        assert!(config.log_dir().ends_with("anidb/logs"));

        config.logging.log_dir = "/var/log/anidb".to_string();
        assert_eq!(config.log_dir(), PathBuf::from("/var/log/anidb"));
    }
}
