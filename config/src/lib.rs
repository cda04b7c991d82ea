//! Toolrelay Configuration
//!
//! TOML configuration for the relay server, its client commands and the
//! built-in tools.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use toolrelay_config::ConfigLoader;
//!
//! let config = ConfigLoader::new("toolrelay.toml").load().unwrap();
//! println!("Listening on {}{}", config.server.bind, config.server.path);
//! ```
//!
//! # File Layout
//!
//! ```text
//! [server]
//! bind = "127.0.0.1:8006"
//! path = "/mcp"
//! protocol_version = "2024-11-05"
//! supported_versions = ["2024-11-05"]
//!
//! [client]
//! url = "http://127.0.0.1:8006/mcp"
//! timeout_secs = 30
//!
//! [tools.calculator]
//! enabled = true
//!
//! [tools.web_search]
//! enabled = true
//! endpoint = "https://ai-proxy.lab.epam.com"
//! deployment = "gemini-2.0-flash-exp-google-search"
//! api_key_env = "DIAL_API_KEY"
//! ```

pub mod error;
pub mod loader;
pub mod relay;

pub use error::{ConfigError, Result};
pub use loader::{env_vars, get_config_path, load_config, paths, validate_config, ConfigLoader};
pub use relay::{
    CalculatorSection, ClientSection, RelayConfig, ServerSection, ToolsSection, WebSearchSection,
    DEFAULT_PROTOCOL_VERSION,
};
