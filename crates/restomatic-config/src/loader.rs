//! Configuration file loading

use crate::database::DatabaseConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::router::RouterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration for a Restomatic host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestomaticConfig {
    /// Embedded store settings
    pub database: DatabaseConfig,
    /// Endpoint router settings
    pub router: RouterConfig,
}

impl RestomaticConfig {
    /// Reject values that parse but cannot work
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database.path",
                message: "must not be empty".to_string(),
            });
        }
        if self.router.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "router.max_body_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads [`RestomaticConfig`] from files or strings
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, choosing the parser by extension
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<RestomaticConfig> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), format = %extension, "Loading config file");

        let config = match extension.as_str() {
            "toml" => Self::from_toml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse TOML configuration
    pub fn from_toml_str(content: &str) -> ConfigResult<RestomaticConfig> {
        let config: RestomaticConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            format: "toml",
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON configuration
    pub fn from_json_str(content: &str) -> ConfigResult<RestomaticConfig> {
        let config: RestomaticConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                format: "json",
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML configuration
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(content: &str) -> ConfigResult<RestomaticConfig> {
        let config: RestomaticConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                format: "yaml",
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
}
