//! Storage Error Types
//!
//! This module defines all error types that can occur while talking to the
//! replicated substrate.
//!
//! ## Error Categories
//!
//! ### Replica Errors
//! - `Unavailable`: Every replica that was asked failed at the transport level
//! - `ObjectStore`: Low-level object store operation failed
//! - `AppendConflict`: A replica kept changing underneath an append until the
//!   attempt budget ran out
//!
//! ### Session Errors
//! - `NoGroups`: The write/read policy names no replication group
//! - `UnknownGroup`: A policy names a group no replica was configured for
//! - `Config`: A replica backend could not be built
//!
//! ### Data Errors
//! - `Codec`: A stored chunk or log object could not be decoded
//!
//! Missing objects are not errors: reads return `None` and the callers treat
//! that as empty. Checksum mismatches and short quorums are outcomes
//! ([`WriteOutcome`](crate::substrate::WriteOutcome)), not errors.
//!
//! ## Usage
//!
//! All storage operations return `Result<T>` which is aliased to
//! `Result<T, StorageError>`. This allows clean error propagation with `?`.

use crate::substrate::GroupId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Substrate unavailable for {object}: {message}")]
    Unavailable { object: String, message: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("No replication groups configured")]
    NoGroups,

    #[error("Unknown replication group: {0}")]
    UnknownGroup(GroupId),

    #[error("Append to {object} lost {attempts} races in a row")]
    AppendConflict { object: String, attempts: u32 },

    #[error("Invalid replica configuration: {0}")]
    Config(String),

    #[error("Codec error: {0}")]
    Codec(#[from] historydb_core::Error),
}
