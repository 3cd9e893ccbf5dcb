use serde::Deserialize;

use orca_consumer::BrokerConfig;
use orca_storage::StorageConfig;

/// Full service configuration, one section per subsystem.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Registers the destructive delete endpoints. Never enable in
    /// production.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            api_prefix: default_api_prefix(),
            debug: false,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_path")]
    pub path: String,
    /// Refresh cadence for the rule-content catalog; 0 disables the
    /// refresh loop.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: default_content_path(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_content_path() -> String {
    "rules-content".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    300
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
