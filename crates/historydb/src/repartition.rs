//! Repartition Engine
//!
//! Changes the number of chunks of a counter tree, optionally moving it to a
//! new logical key.
//!
//! ## Steps
//!
//! 1. Read the chunk-count record of the source and aggregate the chunks of
//!    its layout. Any failure here aborts before anything is written.
//! 2. Split the aggregate into `n` parts: users in sorted order, user `i`
//!    into chunk `i % n`.
//! 3. Create the parts as a new generation of chunk objects of the target.
//!    Creating chunk 0 claims the generation; when it already exists the next
//!    generation is tried.
//! 4. Switch the target's chunk-count record to the new layout, conditional
//!    on the record read before, and update the shared cache.
//!
//! Until step 4 succeeds readers and writers keep using the old layout, so a
//! failure at any point leaves the counts as they were, plus orphaned chunks
//! of an unused generation. Superseded generations are never read again and
//! are left in place.
//!
//! A relocation (`repartition_activity_to`) leaves the source layout in place,
//! and an existing target tree is replaced, not merged into.
//!
//! Increments that race a repartition are best effort: one that lands in a
//! source chunk after step 1 is not carried over.

use crate::error::{EngineError, Result};
use crate::session::Session;
use historydb_core::{Activity, ActivityKey, ChunkLayout};
use historydb_observability::metrics;
use historydb_storage::WriteOutcome;
use serde::Serialize;

/// What a repartition did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepartitionReport {
    pub source_key: String,
    pub target_key: String,
    pub old_chunk_count: u32,
    pub new_chunk_count: u32,
    pub users: usize,
}

impl Session {
    /// Reshard the counter tree of `key` into `chunk_count` chunks in place.
    pub async fn repartition_activity(
        &self,
        key: impl Into<ActivityKey>,
        chunk_count: u32,
    ) -> Result<RepartitionReport> {
        let key = key.into().resolve()?;
        self.repartition(&key, &key, chunk_count).await
    }

    /// Copy the counter tree of `key` to `new_key` with `chunk_count` chunks.
    pub async fn repartition_activity_to(
        &self,
        key: impl Into<ActivityKey>,
        new_key: &str,
        chunk_count: u32,
    ) -> Result<RepartitionReport> {
        let key = key.into().resolve()?;
        let new_key = ActivityKey::from(new_key).resolve()?;
        self.repartition(&key, &new_key, chunk_count).await
    }

    async fn repartition(&self, source: &str, target: &str, chunk_count: u32) -> Result<RepartitionReport> {
        let result = self.run_repartition(source, target, chunk_count).await;
        let label = match &result {
            Ok(_) => "ok",
            Err(_) => "failed",
        };
        metrics::REPARTITIONS_TOTAL.with_label_values(&[label]).inc();

        match &result {
            Ok(report) => tracing::info!(
                source = %report.source_key,
                target = %report.target_key,
                old_chunk_count = report.old_chunk_count,
                new_chunk_count = report.new_chunk_count,
                users = report.users,
                "Repartitioned activity"
            ),
            Err(e) => tracing::error!(source, target, chunk_count, error = %e, "Repartition failed"),
        }
        result
    }

    async fn run_repartition(&self, source: &str, target: &str, chunk_count: u32) -> Result<RepartitionReport> {
        if chunk_count == 0 {
            return Err(EngineError::InvalidArgument(
                "chunk count must be greater than zero".to_string(),
            ));
        }
        let max = self.max_chunk_count();
        if chunk_count > max {
            return Err(EngineError::InvalidArgument(format!(
                "chunk count {} exceeds the limit of {}",
                chunk_count, max
            )));
        }

        let source_record = self.chunks.read_chunk_count_record(source).await?;
        let source_layout = self.effective_layout(source, source_record.map(|record| record.layout));
        let aggregate = self.aggregate(source, &source_layout).await?;

        let target_record = if source == target {
            source_record
        } else {
            self.chunks.read_chunk_count_record(target).await?
        };
        let previous = self.effective_layout(target, target_record.map(|record| record.layout));

        let layout = self
            .write_generation(target, previous.generation, chunk_count, &aggregate)
            .await?;

        let expected = target_record.map(|record| record.checksum);
        match self.chunks.write_chunk_count(target, expected, layout).await? {
            WriteOutcome::Written { .. } => {}
            WriteOutcome::ChecksumMismatch => {
                self.cache.invalidate(target).await;
                return Err(EngineError::RepartitionConflict {
                    key: target.to_string(),
                });
            }
            WriteOutcome::QuorumNotMet { acks, required } => {
                self.cache.invalidate(target).await;
                return Err(EngineError::QuorumNotMet { acks, required });
            }
        }
        self.cache.insert(target, layout).await;

        tracing::debug!(
            key = target,
            previous_generation = previous.generation,
            generation = layout.generation,
            "Switched chunk layout"
        );

        Ok(RepartitionReport {
            source_key: source.to_string(),
            target_key: target.to_string(),
            old_chunk_count: source_layout.count,
            new_chunk_count: chunk_count,
            users: aggregate.len(),
        })
    }

    /// Create `aggregate` split into `chunk_count` chunks in a generation of
    /// `key` newer than `previous` that no other writer has claimed.
    async fn write_generation(
        &self,
        key: &str,
        previous: u64,
        chunk_count: u32,
        aggregate: &Activity,
    ) -> Result<ChunkLayout> {
        let parts = aggregate.split(chunk_count);
        let attempts = self.max_cas_attempts();
        let mut generation = next_generation(previous);

        for attempt in 1..=attempts {
            let Some((claim, rest)) = parts.split_first() else {
                break;
            };
            if !self.create_chunk(key, generation, 0, claim).await? {
                tracing::debug!(key, generation, attempt, "Generation already claimed, trying the next one");
                generation = generation.saturating_add(1);
                continue;
            }

            for (offset, part) in rest.iter().enumerate() {
                if part.is_empty() {
                    continue;
                }
                let index = offset as u32 + 1;
                if !self.create_chunk(key, generation, index, part).await? {
                    return Err(EngineError::RepartitionConflict {
                        key: key.to_string(),
                    });
                }
            }
            return Ok(ChunkLayout::new(chunk_count, generation));
        }

        Err(EngineError::RepartitionConflict {
            key: key.to_string(),
        })
    }

    /// Create chunk `index` of `generation`; `Ok(false)` when it exists.
    async fn create_chunk(&self, key: &str, generation: u64, index: u32, part: &Activity) -> Result<bool> {
        match self
            .chunks
            .write_chunk_cas(key, generation, index, None, part)
            .await?
        {
            WriteOutcome::Written { .. } => Ok(true),
            WriteOutcome::ChecksumMismatch => Ok(false),
            WriteOutcome::QuorumNotMet { acks, required } => {
                Err(EngineError::QuorumNotMet { acks, required })
            }
        }
    }
}

/// Generations follow the wall clock in milliseconds, and always move past
/// `previous`.
fn next_generation(previous: u64) -> u64 {
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    previous.saturating_add(1).max(now_ms)
}
