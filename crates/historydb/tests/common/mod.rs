//! Shared fixtures for the engine integration tests.
//!
//! Substrate wrappers here force interleavings and failures that are hard to
//! hit by timing alone.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use historydb::{EngineConfig, Provider};
use historydb_core::ObjectId;
use historydb_storage::{
    AppendOutcome, Checksum, GroupId, ReplicatedObjectStore, StorageError, StoredObject, Substrate,
    WriteOutcome, WritePolicy,
};
use object_store::memory::InMemory;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

// ============================================================================
// Builders
// ============================================================================

/// In-memory replicas for `groups`.
pub fn memory_substrate(groups: &[GroupId]) -> Arc<ReplicatedObjectStore> {
    let substrate = groups.iter().fold(ReplicatedObjectStore::new(), |s, group| {
        s.with_replica(*group, Arc::new(InMemory::new()))
    });
    Arc::new(substrate)
}

pub fn engine_config(default_chunk_count: u32) -> EngineConfig {
    EngineConfig {
        default_chunk_count,
        ..EngineConfig::default()
    }
}

/// Provider over `substrate` using every group in `groups`.
pub fn provider_over(
    substrate: Arc<dyn Substrate>,
    groups: &[GroupId],
    min_writes: usize,
    default_chunk_count: u32,
) -> Provider {
    let provider = Provider::new(substrate, engine_config(default_chunk_count));
    provider.set_session_parameters(groups.to_vec(), min_writes);
    provider
}

/// Single in-memory group.
pub fn memory_provider(default_chunk_count: u32) -> Provider {
    provider_over(memory_substrate(&[1]), &[1], 1, default_chunk_count)
}

// ============================================================================
// Lockstep reads
// ============================================================================

/// Holds the first `gate` reads of one object until all of them have read,
/// so every gated reader sees the same version before anyone writes.
pub struct LockstepSubstrate {
    inner: Arc<dyn Substrate>,
    target: ObjectId,
    gate: usize,
    gated_reads: AtomicUsize,
    barrier: Barrier,
    mismatches: AtomicUsize,
}

impl LockstepSubstrate {
    pub fn new(inner: Arc<dyn Substrate>, target: ObjectId, gate: usize) -> Self {
        Self {
            inner,
            target,
            gate,
            gated_reads: AtomicUsize::new(0),
            barrier: Barrier::new(gate),
            mismatches: AtomicUsize::new(0),
        }
    }

    /// Conditional writes that lost on checksum so far.
    pub fn mismatches(&self) -> usize {
        self.mismatches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Substrate for LockstepSubstrate {
    async fn read(
        &self,
        id: &ObjectId,
        groups: &[GroupId],
    ) -> historydb_storage::Result<Option<StoredObject>> {
        let gated = id == &self.target && self.gated_reads.fetch_add(1, Ordering::SeqCst) < self.gate;
        let result = self.inner.read(id, groups).await;
        if gated {
            self.barrier.wait().await;
        }
        result
    }

    async fn write_cas(
        &self,
        id: &ObjectId,
        expected: Option<Checksum>,
        data: Bytes,
        policy: &WritePolicy,
    ) -> historydb_storage::Result<WriteOutcome> {
        let outcome = self.inner.write_cas(id, expected, data, policy).await?;
        if outcome == WriteOutcome::ChecksumMismatch {
            self.mismatches.fetch_add(1, Ordering::SeqCst);
        }
        Ok(outcome)
    }

    async fn append(
        &self,
        id: &ObjectId,
        data: Bytes,
        policy: &WritePolicy,
    ) -> historydb_storage::Result<AppendOutcome> {
        self.inner.append(id, data, policy).await
    }
}

// ============================================================================
// Permanently contended counters
// ============================================================================

/// Every conditional write to a counter chunk loses, as if another writer
/// always got there first. Logs and chunk-count records are unaffected.
pub struct ContendedSubstrate {
    inner: Arc<dyn Substrate>,
    rejected: AtomicUsize,
}

impl ContendedSubstrate {
    pub fn new(inner: Arc<dyn Substrate>) -> Self {
        Self {
            inner,
            rejected: AtomicUsize::new(0),
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

fn is_counter_chunk(id: &ObjectId) -> bool {
    let segments = id.segments();
    segments.first().map(String::as_str) == Some("activity")
        && segments.last().map(String::as_str) != Some("size")
}

#[async_trait]
impl Substrate for ContendedSubstrate {
    async fn read(
        &self,
        id: &ObjectId,
        groups: &[GroupId],
    ) -> historydb_storage::Result<Option<StoredObject>> {
        self.inner.read(id, groups).await
    }

    async fn write_cas(
        &self,
        id: &ObjectId,
        expected: Option<Checksum>,
        data: Bytes,
        policy: &WritePolicy,
    ) -> historydb_storage::Result<WriteOutcome> {
        if is_counter_chunk(id) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Ok(WriteOutcome::ChecksumMismatch);
        }
        self.inner.write_cas(id, expected, data, policy).await
    }

    async fn append(
        &self,
        id: &ObjectId,
        data: Bytes,
        policy: &WritePolicy,
    ) -> historydb_storage::Result<AppendOutcome> {
        self.inner.append(id, data, policy).await
    }
}

// ============================================================================
// Unreadable objects
// ============================================================================

/// Reads of `poisoned` fail, recording that they were attempted.
pub struct PoisonedSubstrate {
    inner: Arc<dyn Substrate>,
    poisoned: ObjectId,
    poisoned_reads: AtomicUsize,
}

impl PoisonedSubstrate {
    pub fn new(inner: Arc<dyn Substrate>, poisoned: ObjectId) -> Self {
        Self {
            inner,
            poisoned,
            poisoned_reads: AtomicUsize::new(0),
        }
    }

    pub fn poisoned_reads(&self) -> usize {
        self.poisoned_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Substrate for PoisonedSubstrate {
    async fn read(
        &self,
        id: &ObjectId,
        groups: &[GroupId],
    ) -> historydb_storage::Result<Option<StoredObject>> {
        if id == &self.poisoned {
            self.poisoned_reads.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Unavailable {
                object: id.to_string(),
                message: "poisoned".to_string(),
            });
        }
        self.inner.read(id, groups).await
    }

    async fn write_cas(
        &self,
        id: &ObjectId,
        expected: Option<Checksum>,
        data: Bytes,
        policy: &WritePolicy,
    ) -> historydb_storage::Result<WriteOutcome> {
        self.inner.write_cas(id, expected, data, policy).await
    }

    async fn append(
        &self,
        id: &ObjectId,
        data: Bytes,
        policy: &WritePolicy,
    ) -> historydb_storage::Result<AppendOutcome> {
        self.inner.append(id, data, policy).await
    }
}

// ============================================================================
// Failing writes
// ============================================================================

/// While armed, conditional writes to objects matching `target` report a
/// missed quorum without touching the store.
pub struct FailingWritesSubstrate {
    inner: Arc<dyn Substrate>,
    target: Box<dyn Fn(&ObjectId) -> bool + Send + Sync>,
    armed: AtomicBool,
    failed: AtomicUsize,
}

impl FailingWritesSubstrate {
    pub fn new<F>(inner: Arc<dyn Substrate>, target: F) -> Self
    where
        F: Fn(&ObjectId) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            target: Box::new(target),
            armed: AtomicBool::new(true),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::SeqCst);
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Substrate for FailingWritesSubstrate {
    async fn read(
        &self,
        id: &ObjectId,
        groups: &[GroupId],
    ) -> historydb_storage::Result<Option<StoredObject>> {
        self.inner.read(id, groups).await
    }

    async fn write_cas(
        &self,
        id: &ObjectId,
        expected: Option<Checksum>,
        data: Bytes,
        policy: &WritePolicy,
    ) -> historydb_storage::Result<WriteOutcome> {
        if self.armed.load(Ordering::SeqCst) && (self.target)(id) {
            self.failed.fetch_add(1, Ordering::SeqCst);
            return Ok(WriteOutcome::QuorumNotMet {
                acks: 0,
                required: policy.min_writes.max(1),
            });
        }
        self.inner.write_cas(id, expected, data, policy).await
    }

    async fn append(
        &self,
        id: &ObjectId,
        data: Bytes,
        policy: &WritePolicy,
    ) -> historydb_storage::Result<AppendOutcome> {
        self.inner.append(id, data, policy).await
    }
}
