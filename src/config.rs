//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.reaction-search.toml` files.

use crate::cli::{Args, Command};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".reaction-search.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// openFDA settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Search client settings.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Backend server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Page size used when a request carries no `limit`.
    #[serde(default = "default_page_size")]
    pub default_limit: u32,

    /// How long browsers may cache CORS preflight answers.
    #[serde(default = "default_cors_max_age")]
    pub cors_max_age_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_limit: default_page_size(),
            cors_max_age_seconds: default_cors_max_age(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_page_size() -> u32 {
    crate::pagination::DEFAULT_PAGE_SIZE
}

fn default_cors_max_age() -> u64 {
    60 * 60
}

/// openFDA settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Drug adverse event endpoint.
    #[serde(default = "default_openfda_url")]
    pub base_url: String,

    /// Optional API key sent as `api_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Optional `sort` parameter, e.g. `receivedate:desc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_openfda_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
            sort: None,
        }
    }
}

fn default_openfda_url() -> String {
    "https://api.fda.gov/drug/event.json".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Search client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Reports requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            page_size: default_page_size(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reject values that would produce invalid upstream requests.
    pub fn validate(&self) -> Result<()> {
        if self.server.default_limit == 0 {
            bail!("server.default_limit must be at least 1");
        }
        if self.client.page_size == 0 {
            bail!("client.page_size must be at least 1");
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from `dir/.reaction-search.toml`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment fallbacks) take precedence over
    /// config file settings, but only when they were actually given.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.openfda_url {
            self.upstream.base_url = url.clone();
        }
        if let Some(ref key) = args.api_key {
            self.upstream.api_key = Some(key.clone());
        }
        if let Some(timeout) = args.timeout {
            self.upstream.timeout_seconds = timeout;
        }

        match args.command {
            Some(Command::Serve(ref serve)) => {
                if let Some(port) = serve.port {
                    self.server.port = port;
                }
                if let Some(ref host) = serve.host {
                    self.server.host = host.clone();
                }
            }
            Some(Command::Search(ref search)) => {
                if let Some(limit) = search.limit {
                    self.client.page_size = limit;
                }
                if let Some(ref url) = search.api_url {
                    self.client.api_url = url.clone();
                }
            }
            None => {}
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
