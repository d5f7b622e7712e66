//! Engine and Provider Configuration
//!
//! ## EngineConfig
//!
//! - **default_chunk_count**: Chunks of a counter tree that was never
//!   repartitioned (default: 16)
//! - **max_cas_attempts**: Conditional-write attempts per increment before
//!   giving up with `Contended` (default: 5)
//! - **max_chunk_count**: Upper bound for repartition targets and for counts
//!   read back from chunk-count records (default: 1024)
//!
//! ## ProviderConfig
//!
//! Everything `Provider::connect` needs: replica backends per group, the
//! session parameters, engine tuning, cache sizing and the log severity.
//!
//! ```toml
//! groups = [1, 2]
//! min_writes = 2
//! log_level = "NOTICE"
//!
//! [substrate]
//! append_attempts = 16
//! [[substrate.replicas]]
//! group = 1
//! backend = "memory"
//! [[substrate.replicas]]
//! group = 2
//! backend = "memory"
//!
//! [engine]
//! default_chunk_count = 16
//! max_cas_attempts = 5
//! max_chunk_count = 1024
//!
//! [cache]
//! ttl_ms = 30000
//! ```

use historydb_storage::{CacheConfig, GroupId, SubstrateConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_chunk_count")]
    pub default_chunk_count: u32,

    #[serde(default = "default_max_cas_attempts")]
    pub max_cas_attempts: u32,

    #[serde(default = "default_max_chunk_count")]
    pub max_chunk_count: u32,
}

fn default_chunk_count() -> u32 {
    16
}

fn default_max_cas_attempts() -> u32 {
    5
}

fn default_max_chunk_count() -> u32 {
    1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_chunk_count: default_chunk_count(),
            max_cas_attempts: default_max_cas_attempts(),
            max_chunk_count: default_max_chunk_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub substrate: SubstrateConfig,

    /// Groups used by sessions; every configured replica when absent
    #[serde(default)]
    pub groups: Option<Vec<GroupId>>,

    /// Minimum acknowledged writes, clamped to the group count (default: 1)
    #[serde(default = "default_min_writes")]
    pub min_writes: usize,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// One of DATA, ERROR, INFO, NOTICE, DEBUG (default: INFO)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_min_writes() -> usize {
    1
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            substrate: SubstrateConfig::default(),
            groups: None,
            min_writes: default_min_writes(),
            engine: EngineConfig::default(),
            cache: CacheConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl ProviderConfig {
    /// Session groups: the explicit list, or every configured replica.
    pub fn session_groups(&self) -> Vec<GroupId> {
        self.groups
            .clone()
            .unwrap_or_else(|| self.substrate.groups())
    }
}
