//! Replicated Object Store
//!
//! Implements [`Substrate`] over one `object_store` replica per replication
//! group.
//!
//! ## Conditional Writes
//!
//! ```text
//!            ┌──────────────┐  guard holds?   ┌──────────────┐
//! write_cas ─▶ primary read ├───────yes──────▶ primary put  │ PutMode::Update(e_tag)
//!            └──────┬───────┘                 └──────┬───────┘ or PutMode::Create
//!                   │ no                             │ ok
//!                   ▼                                ▼
//!           ChecksumMismatch            overwrite remaining replicas
//!                                                    │
//!                                          acks >= min_writes ?
//! ```
//!
//! The primary is the first group of the policy that answers the guard read.
//! Its conditional put makes the read-compare-replace atomic on that replica,
//! so two writers holding the same checksum can never both win.
//!
//! The remaining replicas are brought to the winning value with conditional
//! puts against the version read from each of them. A secondary is replaced
//! when it still holds the value the primary held before the write, or, when
//! it diverged, only while the primary still holds the new value. A delayed
//! write from an earlier winner therefore never rolls a secondary back past a
//! later one.
//!
//! ## Appends
//!
//! Every replica appends independently with a read + conditional put loop,
//! bounded by `append_attempts`. Appends are not guarded by the caller, so
//! replicas converge on the same entries but may order concurrent appends
//! differently.
//!
//! ## Quorum
//!
//! A logical write succeeds when at least `min_writes` replicas (and always at
//! least one) acknowledged it. Replicas that did persist the value keep it even
//! when the write as a whole is reported as failed.

use crate::error::{Result, StorageError};
use crate::substrate::{
    object_path, AppendOutcome, Checksum, GroupId, StoredObject, Substrate, WriteOutcome,
    WritePolicy,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::future::join_all;
use historydb_core::ObjectId;
use historydb_observability::metrics;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutMode, UpdateVersion};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_APPEND_ATTEMPTS: u32 = 16;
const SECONDARY_SYNC_ATTEMPTS: u32 = 3;

type Replica = (GroupId, Arc<dyn ObjectStore>);

pub struct ReplicatedObjectStore {
    replicas: BTreeMap<GroupId, Arc<dyn ObjectStore>>,
    append_attempts: u32,
}

impl ReplicatedObjectStore {
    pub fn new() -> Self {
        Self {
            replicas: BTreeMap::new(),
            append_attempts: DEFAULT_APPEND_ATTEMPTS,
        }
    }

    /// Serve `group` from `store`, replacing any previous replica.
    pub fn with_replica(mut self, group: GroupId, store: Arc<dyn ObjectStore>) -> Self {
        self.replicas.insert(group, store);
        self
    }

    pub fn with_append_attempts(mut self, attempts: u32) -> Self {
        self.append_attempts = attempts.max(1);
        self
    }

    pub fn has_group(&self, group: GroupId) -> bool {
        self.replicas.contains_key(&group)
    }

    /// Configured groups, ascending.
    pub fn groups(&self) -> Vec<GroupId> {
        self.replicas.keys().copied().collect()
    }

    pub fn replica(&self, group: GroupId) -> Option<&Arc<dyn ObjectStore>> {
        self.replicas.get(&group)
    }

    /// Replicas of `groups` in policy order; a group listed twice is one
    /// replica.
    fn resolve(&self, groups: &[GroupId]) -> Result<Vec<Replica>> {
        if groups.is_empty() {
            return Err(StorageError::NoGroups);
        }
        let mut replicas: Vec<Replica> = Vec::with_capacity(groups.len());
        for group in groups {
            if replicas.iter().any(|(seen, _)| seen == group) {
                continue;
            }
            let store = self
                .replicas
                .get(group)
                .ok_or(StorageError::UnknownGroup(*group))?;
            replicas.push((*group, Arc::clone(store)));
        }
        Ok(replicas)
    }

    async fn append_replica(
        &self,
        group: GroupId,
        store: &Arc<dyn ObjectStore>,
        path: &Path,
        data: &Bytes,
    ) -> Result<()> {
        for attempt in 0..self.append_attempts {
            let (meta, existing) = match read_replica(store, path).await? {
                Some((meta, existing)) => (Some(meta), existing),
                None => (None, Bytes::new()),
            };

            let mut buf = BytesMut::with_capacity(existing.len() + data.len());
            buf.extend_from_slice(&existing);
            buf.extend_from_slice(data);

            match store
                .put_opts(path, buf.freeze(), put_mode(meta.as_ref()).into())
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) if is_conflict(&e) => {
                    tracing::debug!(
                        group,
                        object = %path,
                        attempt = attempt + 1,
                        "Append raced with another writer, retrying"
                    );
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        metrics::SUBSTRATE_ERRORS_TOTAL
            .with_label_values(&["append", "exhausted"])
            .inc();
        Err(StorageError::AppendConflict {
            object: path.to_string(),
            attempts: self.append_attempts,
        })
    }
}

impl Default for ReplicatedObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReplicatedObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicatedObjectStore")
            .field("groups", &self.groups())
            .field("append_attempts", &self.append_attempts)
            .finish()
    }
}

/// Fetch an object with the metadata needed for a conditional put.
async fn read_replica(
    store: &Arc<dyn ObjectStore>,
    path: &Path,
) -> std::result::Result<Option<(ObjectMeta, Bytes)>, object_store::Error> {
    match store.get(path).await {
        Ok(result) => {
            let meta = result.meta.clone();
            let data = result.bytes().await?;
            Ok(Some((meta, data)))
        }
        Err(object_store::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// How a secondary ended up after a conditional write won on the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecondarySync {
    Written,
    AlreadyCurrent,
    /// A later write owns this replica; it was left alone.
    Superseded,
}

impl SecondarySync {
    fn acknowledged(self) -> bool {
        !matches!(self, SecondarySync::Superseded)
    }
}

/// Bring `secondary` to `data`, which replaced `expected` on `primary`.
async fn sync_secondary(
    primary: &Arc<dyn ObjectStore>,
    secondary: &Arc<dyn ObjectStore>,
    path: &Path,
    expected: Option<Checksum>,
    data: &Bytes,
) -> std::result::Result<SecondarySync, object_store::Error> {
    let written = Checksum::of(data);

    for _ in 0..SECONDARY_SYNC_ATTEMPTS {
        let current = read_replica(secondary, path).await?;
        let checksum = current.as_ref().map(|(_, existing)| Checksum::of(existing));
        if checksum == Some(written) {
            return Ok(SecondarySync::AlreadyCurrent);
        }

        if checksum != expected {
            let on_primary = read_replica(primary, path)
                .await?
                .map(|(_, existing)| Checksum::of(&existing));
            if on_primary != Some(written) {
                return Ok(SecondarySync::Superseded);
            }
        }

        let meta = current.map(|(meta, _)| meta);
        match secondary
            .put_opts(path, data.clone(), put_mode(meta.as_ref()).into())
            .await
        {
            Ok(_) => return Ok(SecondarySync::Written),
            Err(e) if is_conflict(&e) => tokio::task::yield_now().await,
            Err(e) => return Err(e),
        }
    }
    Ok(SecondarySync::Superseded)
}

/// Replace exactly the version that was read, or create when nothing was.
fn put_mode(meta: Option<&ObjectMeta>) -> PutMode {
    match meta {
        Some(meta) => PutMode::Update(UpdateVersion {
            e_tag: meta.e_tag.clone(),
            version: meta.version.clone(),
        }),
        None => PutMode::Create,
    }
}

/// The object changed between the read and the conditional put.
fn is_conflict(e: &object_store::Error) -> bool {
    matches!(
        e,
        object_store::Error::Precondition { .. }
            | object_store::Error::AlreadyExists { .. }
            | object_store::Error::NotFound { .. }
    )
}

fn required_acks(policy: &WritePolicy) -> usize {
    policy.min_writes.max(1)
}

fn record_latency(operation: &str, start: Instant) {
    metrics::SUBSTRATE_LATENCY
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
}

#[async_trait]
impl Substrate for ReplicatedObjectStore {
    async fn read(&self, id: &ObjectId, groups: &[GroupId]) -> Result<Option<StoredObject>> {
        let replicas = self.resolve(groups)?;
        let path = object_path(id);
        let mut answered = false;
        let mut last_error = None;

        for (group, store) in &replicas {
            metrics::SUBSTRATE_REQUESTS_TOTAL
                .with_label_values(&["read"])
                .inc();
            let start = Instant::now();

            match read_replica(store, &path).await {
                Ok(Some((_, data))) => {
                    record_latency("read", start);
                    return Ok(Some(StoredObject::new(data)));
                }
                Ok(None) => {
                    record_latency("read", start);
                    answered = true;
                }
                Err(e) => {
                    metrics::SUBSTRATE_ERRORS_TOTAL
                        .with_label_values(&["read", "unavailable"])
                        .inc();
                    tracing::warn!(
                        group,
                        object = %id,
                        error = %e,
                        "Replica read failed, trying next group"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(StorageError::Unavailable {
                object: id.to_string(),
                message: e.to_string(),
            }),
            _ => Ok(None),
        }
    }

    async fn write_cas(
        &self,
        id: &ObjectId,
        expected: Option<Checksum>,
        data: Bytes,
        policy: &WritePolicy,
    ) -> Result<WriteOutcome> {
        let replicas = self.resolve(&policy.groups)?;
        let required = required_acks(policy);
        let path = object_path(id);
        let start = Instant::now();
        metrics::SUBSTRATE_REQUESTS_TOTAL
            .with_label_values(&["write_cas"])
            .inc();

        // Guard evaluation on the first group that answers
        let mut primary = None;
        for (index, (group, store)) in replicas.iter().enumerate() {
            match read_replica(store, &path).await {
                Ok(current) => {
                    let checksum = current.as_ref().map(|(_, data)| Checksum::of(data));
                    if checksum != expected {
                        tracing::debug!(
                            group,
                            object = %id,
                            expected = ?expected,
                            actual = ?checksum,
                            "Checksum mismatch on primary"
                        );
                        return Ok(WriteOutcome::ChecksumMismatch);
                    }
                    primary = Some((index, current.map(|(meta, _)| meta)));
                    break;
                }
                Err(e) => {
                    metrics::SUBSTRATE_ERRORS_TOTAL
                        .with_label_values(&["write_cas", "unavailable"])
                        .inc();
                    tracing::warn!(
                        group,
                        object = %id,
                        error = %e,
                        "Primary candidate unavailable, trying next group"
                    );
                }
            }
        }

        let Some((primary_index, meta)) = primary else {
            metrics::QUORUM_FAILURES_TOTAL
                .with_label_values(&["write_cas"])
                .inc();
            tracing::error!(object = %id, required, "No replica could evaluate the write guard");
            return Ok(WriteOutcome::QuorumNotMet { acks: 0, required });
        };

        let (primary_group, primary_store) = &replicas[primary_index];
        match primary_store
            .put_opts(&path, data.clone(), put_mode(meta.as_ref()).into())
            .await
        {
            Ok(_) => {}
            Err(e) if is_conflict(&e) => {
                tracing::debug!(
                    group = primary_group,
                    object = %id,
                    "Primary changed between guard read and put"
                );
                return Ok(WriteOutcome::ChecksumMismatch);
            }
            Err(e) => {
                metrics::SUBSTRATE_ERRORS_TOTAL
                    .with_label_values(&["write_cas", "unavailable"])
                    .inc();
                metrics::QUORUM_FAILURES_TOTAL
                    .with_label_values(&["write_cas"])
                    .inc();
                tracing::error!(
                    group = primary_group,
                    object = %id,
                    error = %e,
                    "Primary put failed"
                );
                return Ok(WriteOutcome::QuorumNotMet { acks: 0, required });
            }
        }

        let path = &path;
        let data_ref = &data;
        let secondaries = replicas
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != primary_index)
            .map(|(_, (group, store))| async move {
                let result = sync_secondary(primary_store, store, path, expected, data_ref).await;
                (*group, result)
            });

        let mut acks = 1;
        for (group, result) in join_all(secondaries).await {
            match result {
                Ok(sync) if sync.acknowledged() => acks += 1,
                Ok(_) => {
                    tracing::debug!(group, object = %id, "Replica already holds a later write");
                }
                Err(e) => {
                    metrics::SUBSTRATE_ERRORS_TOTAL
                        .with_label_values(&["write_cas", "unavailable"])
                        .inc();
                    tracing::warn!(group, object = %id, error = %e, "Replica write failed");
                }
            }
        }
        record_latency("write_cas", start);

        if acks < required {
            metrics::QUORUM_FAILURES_TOTAL
                .with_label_values(&["write_cas"])
                .inc();
            tracing::error!(object = %id, acks, required, "Write quorum not met");
            return Ok(WriteOutcome::QuorumNotMet { acks, required });
        }

        tracing::trace!(object = %id, acks, size = data.len(), "Conditional write applied");
        Ok(WriteOutcome::Written { acks })
    }

    async fn append(
        &self,
        id: &ObjectId,
        data: Bytes,
        policy: &WritePolicy,
    ) -> Result<AppendOutcome> {
        let replicas = self.resolve(&policy.groups)?;
        let required = required_acks(policy);
        let path = object_path(id);
        let start = Instant::now();
        metrics::SUBSTRATE_REQUESTS_TOTAL
            .with_label_values(&["append"])
            .inc();

        let appends = replicas.iter().map(|(group, store)| {
            let path = &path;
            let data = &data;
            async move { (*group, self.append_replica(*group, store, path, data).await) }
        });

        let mut acks = 0;
        for (group, result) in join_all(appends).await {
            match result {
                Ok(()) => acks += 1,
                Err(e) => {
                    tracing::warn!(group, object = %id, error = %e, "Replica append failed");
                }
            }
        }
        record_latency("append", start);

        if acks < required {
            metrics::QUORUM_FAILURES_TOTAL
                .with_label_values(&["append"])
                .inc();
            tracing::error!(object = %id, acks, required, "Append quorum not met");
            return Ok(AppendOutcome::QuorumNotMet { acks, required });
        }

        Ok(AppendOutcome::Appended { acks })
    }
}
