//! Log Store
//!
//! Appends framed entries to a user's daily log object and reads whole daily
//! objects back. Appends go straight to the substrate; no read-modify-write
//! happens at this level.

use crate::error::Result;
use crate::substrate::{AppendOutcome, Substrate, WritePolicy};
use bytes::Bytes;
use historydb_core::keys::{user_log_bucket_key, user_log_key};
use historydb_core::LogEntry;
use historydb_observability::metrics;
use std::sync::Arc;

#[derive(Clone)]
pub struct LogStore {
    substrate: Arc<dyn Substrate>,
    policy: WritePolicy,
}

impl LogStore {
    pub fn new(substrate: Arc<dyn Substrate>, policy: WritePolicy) -> Self {
        Self { substrate, policy }
    }

    /// Append `entry` to `user`'s log for the day of `entry.time`.
    pub async fn append(&self, user: &str, entry: &LogEntry) -> Result<AppendOutcome> {
        let id = user_log_key(user, entry.time);
        let outcome = self
            .substrate
            .append(&id, entry.encode(), &self.policy)
            .await?;

        if let AppendOutcome::Appended { acks } = outcome {
            metrics::LOG_APPENDS_TOTAL.inc();
            metrics::LOG_BYTES_TOTAL.inc_by(entry.data.len() as u64);
            tracing::trace!(user, object = %id, acks, size = entry.data.len(), "Log entry appended");
        }
        Ok(outcome)
    }

    /// Raw framed content of `user`'s log for day `bucket`.
    pub async fn read_bucket(&self, user: &str, bucket: u64) -> Result<Option<Bytes>> {
        let id = user_log_bucket_key(user, bucket);
        let stored = self.substrate.read(&id, &self.policy.groups).await?;
        Ok(stored.map(|object| object.data))
    }
}
