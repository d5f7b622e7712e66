//! Log Engine
//!
//! Per-user logs are split into one object per day. Range reads walk the day
//! buckets intersecting `[begin, end]` in order and skip the ones that were
//! never written. Entries come back whole-bucket: a bucket that intersects
//! the range contributes all of its entries.
//!
//! [`Session::user_log_entries`] is lazy: a bucket is fetched only once the
//! consumer has drained the previous one, so a visitor that stops early never
//! pays for the rest of the range.

use crate::activity::require_user;
use crate::error::{EngineError, Result};
use crate::session::Session;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use historydb_core::keys::buckets_in_range;
use historydb_core::log_entry::{concat_payloads, LogEntryIter};
use historydb_core::LogEntry;
use historydb_storage::AppendOutcome;

impl Session {
    /// Append one entry to `user`'s log for the day of `time`.
    pub async fn append_log(&self, user: &str, time: u64, data: impl Into<Bytes>) -> Result<()> {
        require_user(user)?;
        let entry = LogEntry::new(time, data);
        match self.logs.append(user, &entry).await? {
            AppendOutcome::Appended { .. } => Ok(()),
            AppendOutcome::QuorumNotMet { acks, required } => {
                Err(EngineError::QuorumNotMet { acks, required })
            }
        }
    }

    /// One buffer per existing day bucket intersecting `[begin, end]`, in
    /// chronological order. Each buffer holds that day's payloads
    /// concatenated in append order.
    pub async fn get_user_logs(&self, user: &str, begin: u64, end: u64) -> Result<Vec<Bytes>> {
        require_user(user)?;
        let mut logs = Vec::new();
        for bucket in buckets_in_range(begin, end) {
            if let Some(raw) = self.logs.read_bucket(user, bucket).await? {
                logs.push(concat_payloads(raw)?);
            }
        }

        tracing::debug!(user, begin, end, buckets = logs.len(), "Read user logs");
        Ok(logs)
    }

    /// Lazy stream of `user`'s entries in the buckets intersecting
    /// `[begin, end]`, oldest bucket first.
    pub fn user_log_entries(&self, user: &str, begin: u64, end: u64) -> BoxStream<'static, Result<LogEntry>> {
        if let Err(e) = require_user(user) {
            return stream::once(async move { Err(e) }).boxed();
        }

        let state = (buckets_in_range(begin, end), self.logs.clone(), user.to_string());
        stream::unfold(state, |(mut buckets, logs, user)| async move {
            loop {
                let Some(bucket) = buckets.next() else {
                    return None;
                };
                let entries: Vec<Result<LogEntry>> = match logs.read_bucket(&user, bucket).await {
                    Ok(Some(raw)) => LogEntryIter::new(raw)
                        .map(|entry| entry.map_err(EngineError::from))
                        .collect(),
                    Ok(None) => continue,
                    Err(e) => vec![Err(e.into())],
                };
                return Some((stream::iter(entries), (buckets, logs, user)));
            }
        })
        .flatten()
        .boxed()
    }

    /// Feed `user`'s entries to `visitor` until it returns `false`. Returns
    /// the number of entries visited.
    pub async fn for_user_logs<F>(&self, user: &str, begin: u64, end: u64, mut visitor: F) -> Result<usize>
    where
        F: FnMut(&LogEntry) -> bool,
    {
        let mut entries = self.user_log_entries(user, begin, end);
        let mut visited = 0;
        while let Some(entry) = entries.next().await {
            let entry = entry?;
            visited += 1;
            if !visitor(&entry) {
                break;
            }
        }
        Ok(visited)
    }
}
