//! Configuration for the template updater
//!
//! Configuration is read from a TOML file:
//!
//! ```toml
//! user_path = "/home/me/.local/share/element-template-updater"
//! fetch_timeout_secs = 30
//!
//! [[endpoints]]
//! execution_platform = "Camunda Cloud"
//! file_name = ".camunda-connectors-8.json"
//! url = "https://marketplace.example.com/connectors/index.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::types::Endpoint;

/// Directory name used below the platform data dir when no user path is configured
pub const DEFAULT_APP_DIR: &str = "element-template-updater";

/// Default per-request timeout for remote fetches
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Updater configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Root below which `resources/element-templates/` lives
    #[serde(default)]
    pub user_path: Option<PathBuf>,

    /// Timeout applied to every HTTP request
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Remote indexes to keep in sync
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            user_path: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            endpoints: Vec::new(),
        }
    }
}

impl UpdaterConfig {
    /// Read and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject endpoints that cannot be mapped to a cache file or fetched
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(Error::config("fetch_timeout_secs must be greater than zero"));
        }

        for endpoint in &self.endpoints {
            if endpoint.url.trim().is_empty() {
                return Err(Error::config(format!(
                    "Endpoint for platform '{}' has an empty url",
                    endpoint.execution_platform
                )));
            }
            if endpoint.file_name.trim().is_empty() {
                return Err(Error::config(format!(
                    "Endpoint {} has an empty file_name",
                    endpoint.url
                )));
            }
            if endpoint.file_name.contains(['/', '\\']) || endpoint.file_name == ".." {
                return Err(Error::config(format!(
                    "Endpoint {} file_name '{}' must be a plain file name",
                    endpoint.url, endpoint.file_name
                )));
            }
        }

        Ok(())
    }

    /// The configured user path, or the platform data directory
    pub fn resolve_user_path(&self) -> Result<PathBuf> {
        if let Some(user_path) = &self.user_path {
            return Ok(user_path.clone());
        }

        dirs::data_dir()
            .map(|dir| dir.join(DEFAULT_APP_DIR))
            .ok_or_else(|| Error::config("Could not determine a data directory; set user_path"))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
user_path = "/tmp/modeler"
fetch_timeout_secs = 10

[[endpoints]]
execution_platform = "Camunda Cloud"
file_name = ".camunda-connectors.json"
url = "https://marketplace.example.com/index.json"

[[endpoints]]
executionPlatform = "Camunda Platform"
fileName = ".c7-connectors.json"
url = "https://marketplace.example.com/c7/index.json"
"#;

    #[test]
    fn test_parse_config() {
        let config = UpdaterConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.user_path, Some(PathBuf::from("/tmp/modeler")));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].execution_platform, "Camunda Cloud");
        assert_eq!(config.endpoints[1].file_name, ".c7-connectors.json");
    }

    #[test]
    fn test_defaults() {
        let config = UpdaterConfig::from_toml("").unwrap();

        assert_eq!(config, UpdaterConfig::default());
        assert_eq!(config.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn test_rejects_path_in_file_name() {
        let result = UpdaterConfig::from_toml(
            r#"
[[endpoints]]
execution_platform = "Camunda Cloud"
file_name = "../escape.json"
url = "https://marketplace.example.com/index.json"
"#,
        );

        match result.unwrap_err() {
            Error::Config(msg) => assert!(msg.contains("plain file name")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_empty_url() {
        let result = UpdaterConfig::from_toml(
            r#"
[[endpoints]]
execution_platform = "Camunda Cloud"
file_name = "c8.json"
url = ""
"#,
        );

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = UpdaterConfig::from_toml("fetch_timeout_secs = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("updater.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = UpdaterConfig::load(&path).unwrap();
        assert_eq!(config.endpoints.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let result = UpdaterConfig::load(&temp_dir.path().join("missing.toml"));

        match result.unwrap_err() {
            Error::Config(msg) => assert!(msg.contains("Failed to read configuration")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_configured_user_path_wins() {
        let config = UpdaterConfig {
            user_path: Some(PathBuf::from("/srv/templates")),
            ..Default::default()
        };

        assert_eq!(
            config.resolve_user_path().unwrap(),
            PathBuf::from("/srv/templates")
        );
    }
}
