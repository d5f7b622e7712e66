//! Substrate Configuration
//!
//! Describes which object store backs each replication group.
//!
//! ## ReplicaConfig
//!
//! - **group**: Replication group number the replica serves
//! - **backend**: `memory` (process-local, for tests and development) or `s3`
//!
//! S3 replicas are built with `AmazonS3Builder::from_env()`, so credentials
//! and endpoints follow the usual `AWS_*` variables. Conditional writes need
//! the bucket's conditional put mode enabled (`AWS_CONDITIONAL_PUT=etag`).
//!
//! ## Usage
//!
//! ```toml
//! append_attempts = 16
//!
//! [[replicas]]
//! group = 1
//! backend = "memory"
//!
//! [[replicas]]
//! group = 2
//! backend = "s3"
//! bucket = "historydb-group-2"
//! region = "us-east-1"
//! ```

use crate::error::{Result, StorageError};
use crate::replicated::ReplicatedObjectStore;
use crate::substrate::GroupId;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ReplicaBackend {
    Memory,
    S3 {
        bucket: String,
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint (MinIO/localstack)
        #[serde(default)]
        endpoint: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaConfig {
    pub group: GroupId,
    #[serde(flatten)]
    pub backend: ReplicaBackend,
}

impl ReplicaConfig {
    pub fn build(&self) -> Result<Arc<dyn ObjectStore>> {
        match &self.backend {
            ReplicaBackend::Memory => Ok(Arc::new(InMemory::new())),
            ReplicaBackend::S3 {
                bucket,
                region,
                endpoint,
            } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                let store = builder.build().map_err(|e| {
                    StorageError::Config(format!("group {}: {}", self.group, e))
                })?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateConfig {
    #[serde(default = "default_replicas")]
    pub replicas: Vec<ReplicaConfig>,

    /// Conditional-update attempts per replica for one append (default: 16)
    #[serde(default = "default_append_attempts")]
    pub append_attempts: u32,
}

fn default_replicas() -> Vec<ReplicaConfig> {
    vec![ReplicaConfig {
        group: 1,
        backend: ReplicaBackend::Memory,
    }]
}

fn default_append_attempts() -> u32 {
    16
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            replicas: default_replicas(),
            append_attempts: default_append_attempts(),
        }
    }
}

impl SubstrateConfig {
    /// Configured group numbers in declaration order.
    pub fn groups(&self) -> Vec<GroupId> {
        self.replicas.iter().map(|r| r.group).collect()
    }

    /// Build the replicated substrate. Group numbers must be unique.
    pub fn build(&self) -> Result<ReplicatedObjectStore> {
        if self.replicas.is_empty() {
            return Err(StorageError::NoGroups);
        }
        let mut store = ReplicatedObjectStore::new().with_append_attempts(self.append_attempts);
        for replica in &self.replicas {
            if store.has_group(replica.group) {
                return Err(StorageError::Config(format!(
                    "group {} configured twice",
                    replica.group
                )));
            }
            store = store.with_replica(replica.group, replica.build()?);
        }
        Ok(store)
    }
}
