//! Server Configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Provider settings sit at the top level of the file next to
//! the listener settings.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! groups = [1, 2]
//! min_writes = 2
//! log_level = "INFO"
//!
//! [[substrate.replicas]]
//! group = 1
//! backend = "memory"
//!
//! [[substrate.replicas]]
//! group = 2
//! backend = "s3"
//! bucket = "historydb-group-2"
//! ```
//!
//! ## Environment Variables
//!
//! - `HISTORYDB_HOST`: Listen address
//! - `HISTORYDB_PORT`: Listen port
//! - `HISTORYDB_LOG_LEVEL`: DATA, ERROR, INFO, NOTICE or DEBUG
//! - `HISTORYDB_GROUPS`: Comma separated session groups, e.g. `1,2,3`
//! - `HISTORYDB_MIN_WRITES`: Minimum acknowledged writes
//! - `HISTORYDB_DEFAULT_CHUNK_COUNT`: Chunks of a never repartitioned key

use historydb::ProviderConfig;
use historydb_storage::GroupId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(flatten)]
    pub provider: ProviderConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            provider: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read `path` when given (defaults otherwise) and apply the process
    /// environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Apply `HISTORYDB_*` overrides looked up through `var`.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("HISTORYDB_HOST") {
            self.host = host;
        }
        if let Some(port) = var("HISTORYDB_PORT") {
            self.port = parse_env("HISTORYDB_PORT", &port)?;
        }
        if let Some(level) = var("HISTORYDB_LOG_LEVEL") {
            self.provider.log_level = level;
        }
        if let Some(groups) = var("HISTORYDB_GROUPS") {
            let groups = groups
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(|g| parse_env::<GroupId>("HISTORYDB_GROUPS", g))
                .collect::<Result<Vec<_>, _>>()?;
            self.provider.groups = Some(groups);
        }
        if let Some(min_writes) = var("HISTORYDB_MIN_WRITES") {
            self.provider.min_writes = parse_env("HISTORYDB_MIN_WRITES", &min_writes)?;
        }
        if let Some(count) = var("HISTORYDB_DEFAULT_CHUNK_COUNT") {
            self.provider.engine.default_chunk_count =
                parse_env("HISTORYDB_DEFAULT_CHUNK_COUNT", &count)?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}
