use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{FormatsProxyError, Result};

/// Main configuration structure for the formats proxy
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// HTTP proxy server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Address to listen on (e.g., "127.0.0.1:8000")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Media type assumed when the client sends no Accept header
    #[serde(default = "default_accept")]
    pub default_accept: String,
    /// Outbound fetch timeout in seconds. Unset means the fetch is unbounded.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Upper bound when buffering an inbound request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            default_accept: default_accept(),
            timeout_secs: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_accept() -> String {
    "text/n3".to_string()
}

fn default_max_body_bytes() -> usize {
    usize::MAX
}

impl Config {
    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FormatsProxyError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FormatsProxyError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load the config from an explicit path, or the first default location
    /// that exists, falling back to built-in defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        for path in default_config_paths().iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }
}

fn default_config_paths() -> [Option<PathBuf>; 3] {
    [
        dirs::home_dir().map(|h| h.join(".rdf-formats-proxy").join("config.toml")),
        dirs::config_dir().map(|c| c.join("rdf-formats-proxy").join("config.toml")),
        Some(PathBuf::from("config.toml")),
    ]
}
