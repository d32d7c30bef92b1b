//! Configuration for docshard components
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file
//! (`docshard.toml`, or the path in `DOCSHARD_CONFIG`), then `DOCSHARD_*`
//! environment variables. Binaries apply their CLI flags on top.

use crate::common::{parse_duration, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "docshard.toml";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage node addresses, in declared (ordinal) order
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Per-node connect + probe timeout at startup (e.g. "5s", "500ms")
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Storage node server settings
    #[serde(default)]
    pub node: NodeConfig,
}

/// One node at the address `docshard-node serve` binds by default
fn default_nodes() -> Vec<String> {
    vec![format!("http://{}", default_bind_addr())]
}
fn default_connect_timeout() -> String {
    "5s".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Storage node server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Bind address for the node HTTP API
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Directory for the document log; in-memory collection when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// When to flush/fsync the document log
    #[serde(default)]
    pub sync: LogSyncPolicy,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7100))
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: None,
            sync: LogSyncPolicy::default(),
        }
    }
}

/// Document log sync policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSyncPolicy {
    /// fsync after every record
    Always,
    /// Hand every record to the OS as it is written; fsync on close
    #[default]
    Flush,
    /// Never fsync, not even on close
    Never,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            connect_timeout: default_connect_timeout(),
            log_level: default_log_level(),
            node: NodeConfig::default(),
        }
    }
}

impl Config {
    /// Load from `DOCSHARD_CONFIG` (or `docshard.toml`) and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var("DOCSHARD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Load from a specific file (missing file is fine) and the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(false))
            .add_source(
                config::Environment::with_prefix("DOCSHARD")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("nodes")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed per-node connect timeout
    pub fn connect_timeout(&self) -> Result<Duration> {
        let timeout = parse_duration(&self.connect_timeout)?;
        if timeout.is_zero() {
            return Err(crate::Error::InvalidConfig(
                "connect_timeout must be greater than zero".into(),
            ));
        }
        Ok(timeout)
    }

    pub fn validate(&self) -> Result<()> {
        self.connect_timeout()?;
        if self.nodes.iter().any(|n| n.trim().is_empty()) {
            return Err(crate::Error::InvalidConfig(
                "node addresses cannot be empty".into(),
            ));
        }
        Ok(())
    }
}
