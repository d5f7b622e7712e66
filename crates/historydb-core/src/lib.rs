pub mod activity;
pub mod error;
pub mod keys;
pub mod log_entry;
pub mod varint;

pub use activity::Activity;
pub use error::{Error, Result};
pub use keys::{ActivityKey, ChunkLayout, ObjectId};
pub use log_entry::LogEntry;
