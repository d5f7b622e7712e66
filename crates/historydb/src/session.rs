//! Per-Call Session
//!
//! A [`Session`] is the engine context of one logical operation. It snapshots
//! the session parameters (groups and `min_writes`) when it is created and
//! shares the substrate, the chunk-count cache and the engine configuration
//! with every other session. Nothing a session holds outlives the call, so
//! concurrent requests never share mutable engine state.
//!
//! The operations themselves live next to their concerns:
//! [`activity`](crate::activity), [`logs`](crate::logs) and
//! [`repartition`](crate::repartition) each add an `impl Session` block.

use crate::config::EngineConfig;
use crate::error::Result;
use historydb_core::ChunkLayout;
use historydb_storage::{
    ChunkCountCache, ChunkStore, GroupId, LogStore, Substrate, WritePolicy,
};
use std::sync::Arc;

/// Replication groups and write quorum used by sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParameters {
    groups: Vec<GroupId>,
    min_writes: usize,
}

impl SessionParameters {
    /// Repeated groups are dropped (first occurrence kept) and `min_writes`
    /// is clamped to the number of distinct groups.
    pub fn new(groups: Vec<GroupId>, min_writes: usize) -> Self {
        let mut distinct = Vec::with_capacity(groups.len());
        for group in groups {
            if !distinct.contains(&group) {
                distinct.push(group);
            }
        }
        let min_writes = min_writes.min(distinct.len());
        Self {
            groups: distinct,
            min_writes,
        }
    }

    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    pub fn min_writes(&self) -> usize {
        self.min_writes
    }

    pub fn write_policy(&self) -> WritePolicy {
        WritePolicy::new(self.groups.clone(), self.min_writes)
    }
}

#[derive(Clone)]
pub struct Session {
    pub(crate) chunks: ChunkStore,
    pub(crate) logs: LogStore,
    pub(crate) cache: Arc<ChunkCountCache>,
    pub(crate) config: Arc<EngineConfig>,
    params: SessionParameters,
}

impl Session {
    pub fn new(
        substrate: Arc<dyn Substrate>,
        params: SessionParameters,
        cache: Arc<ChunkCountCache>,
        config: Arc<EngineConfig>,
    ) -> Self {
        let policy = params.write_policy();
        Self {
            chunks: ChunkStore::new(Arc::clone(&substrate), policy.clone()),
            logs: LogStore::new(substrate, policy),
            cache,
            config,
            params,
        }
    }

    pub fn parameters(&self) -> &SessionParameters {
        &self.params
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn chunk_store(&self) -> &ChunkStore {
        &self.chunks
    }

    pub fn log_store(&self) -> &LogStore {
        &self.logs
    }

    /// Current chunk layout of `key`: cached, else the chunk-count record,
    /// else the configured default in generation 0.
    pub async fn chunk_layout(&self, key: &str) -> Result<ChunkLayout> {
        if let Some(layout) = self.cache.get(key).await {
            return Ok(layout);
        }
        let layout = self.load_chunk_layout(key).await?;
        self.cache.insert(key, layout).await;
        Ok(layout)
    }

    /// Current chunk count of `key`.
    pub async fn chunk_count(&self, key: &str) -> Result<u32> {
        Ok(self.chunk_layout(key).await?.count)
    }

    /// Layout from the record, bypassing the cache.
    pub(crate) async fn load_chunk_layout(&self, key: &str) -> Result<ChunkLayout> {
        let record = self.chunks.read_chunk_count_record(key).await?;
        Ok(self.effective_layout(key, record.map(|record| record.layout)))
    }

    /// A recorded count of 0 means the default; counts above
    /// `max_chunk_count` are clamped to it.
    pub(crate) fn effective_layout(&self, key: &str, recorded: Option<ChunkLayout>) -> ChunkLayout {
        let max = self.max_chunk_count();
        match recorded {
            Some(layout) if layout.count > max => {
                tracing::warn!(
                    key,
                    recorded = layout.count,
                    max_chunk_count = max,
                    "Chunk count record above limit, clamping"
                );
                ChunkLayout::new(max, layout.generation)
            }
            Some(layout) if layout.count > 0 => layout,
            Some(layout) => ChunkLayout::new(self.default_chunk_count(), layout.generation),
            None => ChunkLayout::initial(self.default_chunk_count()),
        }
    }

    pub(crate) fn default_chunk_count(&self) -> u32 {
        self.config.default_chunk_count.clamp(1, self.max_chunk_count())
    }

    pub(crate) fn max_chunk_count(&self) -> u32 {
        self.config.max_chunk_count.max(1)
    }

    pub(crate) fn max_cas_attempts(&self) -> u32 {
        self.config.max_cas_attempts.max(1)
    }
}
