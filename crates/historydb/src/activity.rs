//! Activity Engine
//!
//! Records user activity and maintains the sharded `user -> count` counter
//! trees.
//!
//! ## Increment Protocol
//!
//! ```text
//! pick chunk (random) ─▶ read chunk + checksum ─▶ count += 1 ─▶ write_cas(checksum)
//!        ▲                                                          │
//!        └──────────── ChecksumMismatch (re-roll chunk) ◀───────────┤
//!                                                                   ├─ Written: done
//!                                                                   └─ QuorumNotMet: fail
//! ```
//!
//! Writers never lock. Two writers that read the same chunk version race on
//! the conditional write; the loser re-reads and retries on a freshly picked
//! chunk, up to `max_cas_attempts` in total. Writers on different chunks never
//! conflict and their counts reconcile at read time through merge.

use crate::error::{EngineError, Result};
use crate::session::Session;
use bytes::Bytes;
use futures::future::try_join_all;
use historydb_core::{Activity, ActivityKey, ChunkLayout};
use historydb_observability::metrics;
use historydb_storage::WriteOutcome;
use rand::Rng;
use std::collections::BTreeMap;

/// Result of `add_user_activity`: each sub-operation succeeds or fails on
/// its own.
#[derive(Debug)]
pub struct ActivityOutcome {
    pub log: Result<()>,
    pub statistics: Result<()>,
}

impl ActivityOutcome {
    pub fn log_written(&self) -> bool {
        self.log.is_ok()
    }

    pub fn statistics_updated(&self) -> bool {
        self.statistics.is_ok()
    }

    pub fn is_complete(&self) -> bool {
        self.log_written() && self.statistics_updated()
    }
}

pub(crate) fn require_user(user: &str) -> Result<()> {
    if user.is_empty() {
        return Err(EngineError::InvalidArgument(
            "user must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl Session {
    /// Append `data` to `user`'s daily log and count the user as active in
    /// the counter tree named `key`, or in the day bucket of `time` when no
    /// key (or an empty one) is given. Both happen concurrently.
    pub async fn add_user_activity(
        &self,
        user: &str,
        time: u64,
        data: impl Into<Bytes>,
        key: Option<&str>,
    ) -> ActivityOutcome {
        let data = data.into();
        let activity_key = ActivityKey::from_parts(key, time);

        let statistics = async {
            match activity_key.resolve() {
                Ok(key) => self.increment_activity(user, &key).await,
                Err(e) => Err(e.into()),
            }
        };
        let (log, statistics) = tokio::join!(self.append_log(user, time, data), statistics);

        if let Err(e) = &log {
            tracing::error!(user, time, error = %e, "Failed to write user log");
        }
        if let Err(e) = &statistics {
            tracing::error!(user, key = ?activity_key, error = %e, "Failed to update activity statistics");
        }

        ActivityOutcome { log, statistics }
    }

    /// Count `user` once more in the counter tree `key`.
    pub async fn increment_activity(&self, user: &str, key: &str) -> Result<()> {
        require_user(user)?;
        let layout = self.chunk_layout(key).await?;
        let attempts = self.max_cas_attempts();

        for attempt in 1..=attempts {
            let chunk = rand::thread_rng().gen_range(0..layout.count);
            if self.try_increment(key, &layout, chunk, user, attempt).await? {
                metrics::INCREMENTS_TOTAL.with_label_values(&["ok"]).inc();
                return Ok(());
            }
        }

        self.contended(key, attempts)
    }

    /// Same as `increment_activity`, pinned to one chunk.
    pub async fn increment_chunk(&self, key: &str, chunk: u32, user: &str) -> Result<()> {
        require_user(user)?;
        let layout = self.chunk_layout(key).await?;
        if !layout.contains(chunk) {
            return Err(EngineError::InvalidArgument(format!(
                "chunk {} out of range for {} ({} chunks)",
                chunk, key, layout.count
            )));
        }

        let attempts = self.max_cas_attempts();
        for attempt in 1..=attempts {
            if self.try_increment(key, &layout, chunk, user, attempt).await? {
                metrics::INCREMENTS_TOTAL.with_label_values(&["ok"]).inc();
                return Ok(());
            }
        }

        self.contended(key, attempts)
    }

    /// One read-increment-write cycle. `Ok(false)` means the write lost a
    /// race and may be retried.
    async fn try_increment(
        &self,
        key: &str,
        layout: &ChunkLayout,
        chunk: u32,
        user: &str,
        attempt: u32,
    ) -> Result<bool> {
        let mut current = self.chunks.read_chunk(key, layout.generation, chunk).await?;
        current.activity.increment(user);

        let outcome = self
            .chunks
            .write_chunk_cas(
                key,
                layout.generation,
                chunk,
                current.checksum,
                &current.activity,
            )
            .await?;

        match outcome {
            WriteOutcome::Written { acks } => {
                metrics::CAS_ATTEMPTS_TOTAL
                    .with_label_values(&["written"])
                    .inc();
                tracing::trace!(key, chunk, user, acks, attempt, "Activity incremented");
                Ok(true)
            }
            WriteOutcome::ChecksumMismatch => {
                metrics::CAS_ATTEMPTS_TOTAL
                    .with_label_values(&["mismatch"])
                    .inc();
                tracing::debug!(key, chunk, user, attempt, "Chunk changed concurrently, retrying");
                Ok(false)
            }
            WriteOutcome::QuorumNotMet { acks, required } => {
                metrics::CAS_ATTEMPTS_TOTAL
                    .with_label_values(&["quorum_not_met"])
                    .inc();
                metrics::INCREMENTS_TOTAL.with_label_values(&["failed"]).inc();
                Err(EngineError::QuorumNotMet { acks, required })
            }
        }
    }

    fn contended(&self, key: &str, attempts: u32) -> Result<()> {
        metrics::INCREMENTS_TOTAL
            .with_label_values(&["contended"])
            .inc();
        tracing::warn!(key, attempts, "Giving up on contended counter");
        Err(EngineError::Contended {
            key: key.to_string(),
            attempts,
        })
    }

    /// Merge the chunks of `layout` for `key`, reading them concurrently.
    /// Missing chunks count as empty.
    pub async fn aggregate(&self, key: &str, layout: &ChunkLayout) -> Result<Activity> {
        let reads = (0..layout.count)
            .map(|index| self.chunks.read_chunk(key, layout.generation, index));
        let chunks = try_join_all(reads).await?;
        metrics::AGGREGATE_CHUNKS.observe(layout.count as f64);

        Ok(chunks
            .into_iter()
            .fold(Activity::default(), |acc, chunk| acc.merged(chunk.activity)))
    }

    /// Active users of a counter tree with their counts.
    pub async fn get_active_users(
        &self,
        key: impl Into<ActivityKey>,
    ) -> Result<BTreeMap<String, u32>> {
        let key = key.into().resolve()?;
        let layout = self.chunk_layout(&key).await?;
        let activity = self.aggregate(&key, &layout).await?;

        tracing::debug!(
            key = %key,
            chunk_count = layout.count,
            generation = layout.generation,
            users = activity.len(),
            "Aggregated activity"
        );
        Ok(activity.into_map())
    }

    /// Visit `(user, count)` pairs in user order until `visitor` returns
    /// `false`. Returns the number of pairs visited.
    pub async fn for_active_users<F>(&self, key: impl Into<ActivityKey>, mut visitor: F) -> Result<usize>
    where
        F: FnMut(&str, u32) -> bool,
    {
        let users = self.get_active_users(key).await?;
        let mut visited = 0;
        for (user, count) in &users {
            visited += 1;
            if !visitor(user, *count) {
                break;
            }
        }
        Ok(visited)
    }
}
