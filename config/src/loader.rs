//! Configuration loading utilities
//!
//! Locates the relay configuration file, falls back to defaults when it is
//! absent, and validates the result.

use crate::{ConfigError, RelayConfig, Result};
use std::path::{Path, PathBuf};

/// Configuration loader for a single TOML file
pub struct ConfigLoader {
    /// Path of the configuration file
    path: PathBuf,
    /// Whether to use default values when the file is missing
    use_defaults: bool,
    /// Whether to validate configuration after loading
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_defaults: true,
            validate: true,
        }
    }

    /// Create a loader for the path named by the environment, or the default
    pub fn from_env() -> Self {
        Self::new(get_config_path())
    }

    /// Set whether to use defaults for a missing file
    pub fn use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    /// Set whether to validate configuration
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Load the configuration
    pub fn load(&self) -> Result<RelayConfig> {
        let config = if self.path.exists() {
            tracing::debug!("Loading configuration from {}", self.path.display());
            RelayConfig::load_from(&self.path)?
        } else if self.use_defaults {
            tracing::debug!(
                "No configuration at {}, using defaults",
                self.path.display()
            );
            RelayConfig::default()
        } else {
            return Err(ConfigError::NotFound(self.path.clone()));
        };

        if self.validate {
            validate_config(&config)?;
        }

        Ok(config)
    }

    /// Get the configuration file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Validate configuration for common issues
pub fn validate_config(config: &RelayConfig) -> Result<()> {
    let server = &config.server;

    if !server.path.starts_with('/') {
        return Err(ConfigError::Invalid(format!(
            "Server path must start with '/': {:?}",
            server.path
        )));
    }

    if server.supported_versions.is_empty() {
        return Err(ConfigError::Invalid(
            "At least one supported protocol version is required".to_string(),
        ));
    }

    if !server
        .supported_versions
        .iter()
        .any(|v| *v == server.protocol_version)
    {
        return Err(ConfigError::Invalid(format!(
            "Default protocol version {} is not in supported_versions",
            server.protocol_version
        )));
    }

    if config.client.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "client.timeout_secs must be greater than zero".to_string(),
        ));
    }

    let web_search = &config.tools.web_search;
    if web_search.enabled {
        web_search.endpoint_url()?;

        if web_search.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "tools.web_search.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if web_search.api_key_env.trim().is_empty() {
            tracing::warn!("tools.web_search.api_key_env is empty; web_search will be disabled");
        }
    }

    Ok(())
}

/// Default configuration paths
pub mod paths {
    use std::path::PathBuf;

    /// File name looked up in the working directory
    pub const FILE_NAME: &str = "toolrelay.toml";

    /// System configuration file
    pub fn system_config() -> PathBuf {
        PathBuf::from("/etc/toolrelay").join(FILE_NAME)
    }

    /// User configuration file
    pub fn user_config() -> Option<PathBuf> {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config/toolrelay").join(FILE_NAME))
    }
}

/// Environment variable names used by the configuration system
pub mod env_vars {
    /// Configuration file override
    pub const CONFIG_PATH: &str = "TOOLRELAY_CONFIG";
}

/// Get the configuration path from the environment, else the first existing
/// of `./toolrelay.toml`, the user file and the system file.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(env_vars::CONFIG_PATH) {
        return PathBuf::from(path);
    }

    let local = PathBuf::from(paths::FILE_NAME);
    [Some(local.clone()), paths::user_config(), Some(paths::system_config())]
        .into_iter()
        .flatten()
        .find(|p| p.exists())
        .unwrap_or(local)
}

/// Load the configuration found by [`get_config_path`]
pub fn load_config() -> Result<RelayConfig> {
    ConfigLoader::from_env().load()
}
