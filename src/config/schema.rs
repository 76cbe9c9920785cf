//! Configuration schema for the launcher
//!
//! Configuration is stored at `~/.config/mcp-prometheus/config.toml`.
//! Every section is optional; missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Where releases come from
    pub release: ReleaseConfig,

    /// Local artifact cache
    pub cache: CacheConfig,

    /// HTTP timeouts
    pub network: NetworkConfig,

    /// Runtime used to execute the artifact
    pub runtime: RuntimeConfig,

    /// Defaults handed to the launched server
    pub server: ServerConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Release source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// GitHub repository in `owner/name` form
    pub repository: String,

    /// Base URL of the GitHub API
    pub api_url: String,

    /// Suffix an asset name must end with to be selected
    pub asset_suffix: String,

    /// File name of the cached artifact
    pub artifact_name: String,

    /// Client identifier sent with every request
    pub user_agent: String,
}

impl ReleaseConfig {
    /// Endpoint describing the latest published release
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_url.trim_end_matches('/'),
            self.repository
        )
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            repository: "jeanlopezxyz/mcp-prometheus".to_string(),
            api_url: "https://api.github.com".to_string(),
            asset_suffix: ".jar".to_string(),
            artifact_name: "mcp-prometheus.jar".to_string(),
            user_agent: "mcp-prometheus".to_string(),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Override for the cache directory
    pub dir: Option<PathBuf>,
}

/// Network timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Time allowed to establish a connection
    pub connect_timeout_secs: u64,

    /// Whole-request budget for the release metadata lookup
    pub metadata_timeout_secs: u64,

    /// Whole-transfer budget for one artifact download
    pub download_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            metadata_timeout_secs: 30,
            download_timeout_secs: 600,
        }
    }
}

/// Java runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Program used to run the artifact
    pub program: String,

    /// Minimum major version accepted by the preflight check
    pub min_version: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            min_version: 21,
        }
    }
}

/// Settings forwarded to the MCP server process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Value for `PROMETHEUS_URL` when the environment leaves it unset
    pub prometheus_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            prometheus_url: "http://localhost:9090".to_string(),
        }
    }
}
