//! HistoryDB
//!
//! Per-user activity logs and "active users" counters on top of a replicated
//! object store that only offers flat objects and checksum-guarded writes.
//!
//! ## What it stores
//!
//! - **User logs**: one object per user per day, entries appended in order
//! - **Activity counters**: `user -> count` mappings per logical key (a day
//!   bucket or an explicit name), sharded over several chunk objects so
//!   concurrent writers rarely touch the same object
//!
//! ## Guarantees
//!
//! - A write is reported successful only when at least `min_writes`
//!   replication groups acknowledged it
//! - Concurrent increments on one chunk are serialized by conditional writes
//!   and bounded retries; no increment is lost silently
//! - The chunk count of a key can change (repartition) without losing counts
//!
//! Consistency is per counter tree and per user log; there are no cross-key
//! transactions.
//!
//! ## Entry points
//!
//! [`Provider`] is the long-lived facade; every call runs in a fresh
//! [`Session`]. See the `activity`, `logs` and `repartition` modules for the
//! algorithms.

pub mod activity;
pub mod config;
pub mod error;
pub mod logs;
pub mod provider;
pub mod repartition;
pub mod session;

pub use activity::ActivityOutcome;
pub use config::{EngineConfig, ProviderConfig};
pub use error::{EngineError, Result};
pub use historydb_core::{Activity, ActivityKey, ChunkLayout, LogEntry};
pub use provider::Provider;
pub use repartition::RepartitionReport;
pub use session::{Session, SessionParameters};
