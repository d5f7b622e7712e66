//! Engine Error Types
//!
//! ## Error Categories
//!
//! - `InvalidArgument`: Empty user, empty key, zero chunk count
//! - `Contended`: A counter increment lost the conditional-write race on
//!   every attempt of its budget
//! - `QuorumNotMet`: Fewer replicas than `min_writes` acknowledged a write;
//!   some replicas may still hold it
//! - `RepartitionConflict`: The chunk-count record changed while a
//!   repartition was running
//! - `Storage` / `Core`: Propagated from the layers below
//!
//! Checksum mismatches never escape the engine: they are retried, and only
//! an exhausted budget is reported (as `Contended`).

use historydb_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Counter {key} still contended after {attempts} attempts")]
    Contended { key: String, attempts: u32 },

    #[error("Write quorum not met: {acks} of {required} replicas acknowledged")]
    QuorumNotMet { acks: usize, required: usize },

    #[error("Chunk count of {key} changed during repartition")]
    RepartitionConflict { key: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Core error: {0}")]
    Core(historydb_core::Error),
}

impl EngineError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, EngineError::InvalidArgument(_))
    }
}

impl From<historydb_core::Error> for EngineError {
    fn from(e: historydb_core::Error) -> Self {
        match e {
            historydb_core::Error::InvalidArgument(message) => EngineError::InvalidArgument(message),
            other => EngineError::Core(other),
        }
    }
}
