//! Relay configuration container
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working local setup.

use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Protocol version served when nothing else is configured
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Complete relay configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP server settings
    pub server: ServerSection,
    /// Client settings used by the `tools` and `call` commands
    pub client: ClientSection,
    /// Built-in tool settings
    pub tools: ToolsSection,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address
    pub bind: SocketAddr,
    /// Endpoint path; must start with `/`
    pub path: String,
    /// Name reported in `serverInfo`
    pub name: String,
    /// Version answered when a client proposes an unsupported one
    pub protocol_version: String,
    /// Versions echoed back when proposed
    pub supported_versions: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8006)),
            path: "/mcp".to_string(),
            name: "toolrelay".to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            supported_versions: vec![DEFAULT_PROTOCOL_VERSION.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Server endpoint URL
    pub url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Name sent in `clientInfo`
    pub client_name: String,
}

impl ClientSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8006/mcp".to_string(),
            timeout_secs: 30,
            client_name: "toolrelay-client".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub calculator: CalculatorSection,
    pub web_search: WebSearchSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorSection {
    pub enabled: bool,
}

impl Default for CalculatorSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Search-grounded completion proxy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchSection {
    pub enabled: bool,
    /// Proxy base URL
    pub endpoint: String,
    /// Deployment (model) name
    pub deployment: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl WebSearchSection {
    /// API key from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parsed endpoint URL
    pub fn endpoint_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.endpoint).map_err(|source| ConfigError::InvalidUrl {
            url: self.endpoint.clone(),
            source,
        })
    }
}

impl Default for WebSearchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://ai-proxy.lab.epam.com".to_string(),
            deployment: "gemini-2.0-flash-exp-google-search".to_string(),
            api_key_env: "DIAL_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_is_default() {
        let config = RelayConfig::from_toml_str("").unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.server.path, "/mcp");
        assert_eq!(config.client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = RelayConfig::from_toml_str(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [tools.web_search]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.server.path, "/mcp");
        assert!(!config.tools.web_search.enabled);
        assert_eq!(config.tools.web_search.api_key_env, "DIAL_API_KEY");
        assert!(config.tools.calculator.enabled);
    }

    #[test]
    fn test_bad_bind_address_fails() {
        let err = RelayConfig::from_toml_str("[server]\nbind = \"nowhere\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");

        let mut config = RelayConfig::default();
        config.client.url = "http://example.test/mcp".to_string();
        config.save_to(&path).unwrap();

        assert_eq!(RelayConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_api_key_reads_named_variable() {
        let section = WebSearchSection {
            api_key_env: "TOOLRELAY_TEST_KEY_UNSET_7F3A".to_string(),
            ..Default::default()
        };
        assert_eq!(section.api_key(), None);

        let section = WebSearchSection {
            api_key_env: "PATH".to_string(),
            ..Default::default()
        };
        assert!(section.api_key().is_some());
    }

    #[test]
    fn test_endpoint_url() {
        let section = WebSearchSection::default();
        assert_eq!(
            section.endpoint_url().unwrap().host_str(),
            Some("ai-proxy.lab.epam.com")
        );

        let section = WebSearchSection {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            section.endpoint_url(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
