//! Error Types for HistoryDB Core
//!
//! This module defines the errors raised by the pure building blocks of
//! HistoryDB: the key scheme, the activity payload codec, and the log entry
//! framing.
//!
//! ## Error Categories
//!
//! ### Argument Errors
//! - `InvalidArgument`: An empty user name, an empty logical key, a zero
//!   chunk count, etc.
//!
//! ### Data Integrity Errors
//! - `Codec`: An activity chunk payload could not be encoded or decoded
//! - `TruncatedLogEntry`: A daily log object ends in the middle of an entry
//!
//! ## Usage
//! All functions in this crate return `Result<T>` which is aliased to
//! `Result<T, Error>`, so callers can propagate with `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Truncated log entry at byte {0}")]
    TruncatedLogEntry(usize),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
