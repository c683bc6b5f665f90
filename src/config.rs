use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::{SyncOptions, DEFAULT_PER_PAGE};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// GitHub authentication and identity settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Synchronization behavior settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// Personal access token (supports ${VAR} expansion)
    pub token: Option<String>,

    /// Authentication method used when no token is given
    #[serde(default = "default_auth_method")]
    pub auth_method: String, // "auto", "gh_cli", "token"

    /// Whose forks to sync; empty means the authenticated user
    #[serde(default)]
    pub username: String,

    /// API base URL override for GitHub Enterprise
    pub api_url: Option<String>,
}

/// Synchronization configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Upper bound on pages fetched per run
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Timeout for the whole run in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String, // "compact", "full"
}

// Default value functions
fn default_auth_method() -> String {
    "auto".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            auth_method: default_auth_method(),
            username: String::new(),
            api_url: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_pages: None,
            timeout: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_values()?;

        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("github-fork-update").join("config.yml"))
    }

    /// Expand environment variables in token and API URL
    pub fn expand_values(&mut self) -> Result<()> {
        if let Some(token) = &self.github.token {
            self.github.token = Some(
                shellexpand::full(token)
                    .context("Failed to expand github.token")?
                    .into_owned(),
            );
        }

        if let Some(url) = &self.github.api_url {
            self.github.api_url = Some(
                shellexpand::full(url)
                    .context("Failed to expand github.api_url")?
                    .into_owned(),
            );
        }

        Ok(())
    }

    /// Sync options derived from this configuration and the CLI flags.
    ///
    /// The page size is always [`DEFAULT_PER_PAGE`]; it is not configurable.
    pub fn sync_options(&self, verbose: bool, debug: bool) -> SyncOptions {
        SyncOptions {
            verbose,
            debug,
            per_page: DEFAULT_PER_PAGE,
            max_pages: self.sync.max_pages,
        }
    }

    /// Deadline for the whole run, if configured
    pub fn run_timeout(&self) -> Option<Duration> {
        self.sync
            .timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert!(config.github.token.is_none());
        assert_eq!(config.github.auth_method, "auto");
        assert_eq!(config.github.username, "");
        assert_eq!(config.sync_options(false, false).per_page, 30);
        assert!(config.sync.max_pages.is_none());
        assert!(config.run_timeout().is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    #[serial]
    fn test_expand_values() {
        env::set_var("TEST_FORK_UPDATE_TOKEN", "ghp_expanded");

        let mut config = Config::default();
        config.github.token = Some("${TEST_FORK_UPDATE_TOKEN}".to_string());

        config.expand_values().expect("Failed to expand values");

        assert_eq!(config.github.token.as_deref(), Some("ghp_expanded"));

        env::remove_var("TEST_FORK_UPDATE_TOKEN");
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let nonexistent_path = Path::new("/nonexistent/path/config.yml");
        let result = Config::load(nonexistent_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.yml");
        std::fs::write(
            &config_path,
            r#"
github:
  username: "octocat"
  api_url: "https://github.example.com/api/v3"
sync:
  max_pages: 5
"#,
        )
        .expect("Failed to write config");

        let config = Config::load(&config_path).expect("Failed to load config");

        assert_eq!(config.github.username, "octocat");
        assert_eq!(
            config.github.api_url.as_deref(),
            Some("https://github.example.com/api/v3")
        );
        assert_eq!(config.github.auth_method, "auto");
        assert_eq!(config.sync.max_pages, Some(5));
    }

    #[test]
    fn test_config_default_path_xdg() {
        let default_path = Config::default_config_path().expect("Failed to get default path");
        assert!(default_path.to_string_lossy().contains("github-fork-update"));
        assert!(default_path.to_string_lossy().ends_with("config.yml"));
    }

    #[test]
    fn test_sync_options_and_timeout() {
        let yaml_content = r#"
sync:
  per_page: 7
  timeout: 120
logging:
  level: "debug"
  format: "full"
"#;

        let config: Config = serde_yaml::from_str(yaml_content).expect("Failed to parse YAML");
        let options = config.sync_options(true, false);

        assert_eq!(options.per_page, DEFAULT_PER_PAGE);
        assert!(options.verbose);
        assert!(!options.debug);
        assert_eq!(config.run_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.logging.format, "full");
    }
}
