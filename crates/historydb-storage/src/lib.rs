//! HistoryDB Storage Layer
//!
//! This crate turns a set of flat object stores, one per replication group,
//! into the storage primitives the activity engine is built on.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────┐
//! │       Activity Engine        │
//! └──────┬───────────────┬───────┘
//!        │               │
//!        ▼               ▼
//! ┌─────────────┐ ┌─────────────┐   ┌─────────────────┐
//! │ ChunkStore  │ │  LogStore   │   │ ChunkCountCache │
//! │ - CAS write │ │ - append    │   │ - LRU + TTL     │
//! └──────┬──────┘ └──────┬──────┘   └─────────────────┘
//!        │ Substrate     │
//!        ▼               ▼
//! ┌──────────────────────────────┐
//! │    ReplicatedObjectStore     │
//! │ - guard on primary           │
//! │ - replicate + count acks     │
//! └──┬────────────┬───────────┬──┘
//!    ▼            ▼           ▼
//! group 1      group 2     group N     (object_store replicas)
//! ```
//!
//! ## Main Components
//!
//! ### Substrate
//! The three-primitive interface (`read`, `write_cas`, `append`) with content
//! checksums and quorum-aware outcomes. [`ReplicatedObjectStore`] implements it
//! over `object_store`, using conditional puts (`PutMode::Create` and
//! `PutMode::Update`) on the primary to make checksum-guarded writes atomic.
//!
//! ### ChunkStore
//! Shard objects of activity counter trees and the per-key chunk-count
//! record. Missing chunks read as empty.
//!
//! ### LogStore
//! Daily per-user log objects made of framed entries.
//!
//! ### ChunkCountCache
//! Process-wide cache of chunk counts so the hot path does not read the
//! count record on every increment.
//!
//! ## Usage Example
//!
//! ```ignore
//! use historydb_storage::{ChunkStore, ReplicatedObjectStore, WritePolicy};
//! use object_store::memory::InMemory;
//!
//! let substrate = Arc::new(
//!     ReplicatedObjectStore::new()
//!         .with_replica(1, Arc::new(InMemory::new()))
//!         .with_replica(2, Arc::new(InMemory::new())),
//! );
//! let chunks = ChunkStore::new(substrate, WritePolicy::new(vec![1, 2], 2));
//!
//! let mut chunk = chunks.read_chunk("19675", 0, 3).await?;
//! chunk.activity.increment("alice");
//! chunks.write_chunk_cas("19675", 0, 3, chunk.checksum, &chunk.activity).await?;
//! ```
//!
//! ## Features
//!
//! - `test-util`: exports [`FaultyObjectStore`], a replica wrapper that can be
//!   switched off to simulate an unreachable group.

pub mod chunk_store;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fault;
pub mod keys_cache;
pub mod log_store;
pub mod replicated;
pub mod substrate;

pub use chunk_store::{Chunk, ChunkCountRecord, ChunkStore};
pub use config::{ReplicaBackend, ReplicaConfig, SubstrateConfig};
pub use error::{Result, StorageError};
#[cfg(any(test, feature = "test-util"))]
pub use fault::FaultyObjectStore;
pub use keys_cache::{CacheConfig, ChunkCountCache};
pub use log_store::LogStore;
pub use replicated::ReplicatedObjectStore;
pub use substrate::{
    AppendOutcome, Checksum, GroupId, StoredObject, Substrate, WriteOutcome, WritePolicy,
};
