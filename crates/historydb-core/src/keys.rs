//! Key Scheme
//!
//! Pure functions that turn semantic coordinates (user, timestamp, logical
//! key, chunk number) into substrate object identifiers.
//!
//! ## Layout
//!
//! ```text
//! activity/<key>/<chunk>         one shard of the counter tree for <key>
//! activity/<key>/g<gen>/<chunk>   one shard after repartition number <gen>
//! activity/<key>/size             chunk-count record for <key>
//! logs/<user>/<day>               one user's log for one day bucket
//! ```
//!
//! A key that was never repartitioned lives in generation 0, the unprefixed
//! chunk paths. Every repartition writes a fresh generation and then switches
//! the chunk-count record to it, so the live chunks are never overwritten by
//! a half-finished layout.
//!
//! Every identifier is derived only from its inputs, so independent writers in
//! different processes converge on the same objects. Segments are kept apart
//! (never joined into one string here) so the storage layer can escape them
//! individually; a user called `a/b` can never alias another object.

use crate::error::{Error, Result};
use std::fmt;

/// Width of one time bucket: one calendar day in seconds (UTC).
pub const BUCKET_WIDTH_SECS: u64 = 24 * 60 * 60;

const ACTIVITY_PREFIX: &str = "activity";
const LOGS_PREFIX: &str = "logs";
const CHUNK_COUNT_SEGMENT: &str = "size";
const GENERATION_PREFIX: &str = "g";

/// Identifier of one object in the substrate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    segments: Vec<String>,
}

impl ObjectId {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Path segments, unescaped
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Addresses one activity counter tree, either by timestamp or by name.
///
/// Replaces the `(time | key)` pairs of the public API:
///
/// ```ignore
/// provider.get_active_users(1_700_000_000).await?;   // day bucket of the time
/// provider.get_active_users("campaign-42").await?;   // explicit key
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKey {
    Time(u64),
    Named(String),
}

impl ActivityKey {
    /// Explicit key when non-empty, otherwise the day bucket of `time`.
    pub fn from_parts(key: Option<&str>, time: u64) -> Self {
        match key {
            Some(k) if !k.is_empty() => ActivityKey::Named(k.to_string()),
            _ => ActivityKey::Time(time),
        }
    }

    /// Logical counter key addressed by this value.
    pub fn resolve(&self) -> Result<String> {
        match self {
            ActivityKey::Time(time) => Ok(time_bucket_key(*time)),
            ActivityKey::Named(key) if key.is_empty() => Err(Error::InvalidArgument(
                "activity key must not be empty".to_string(),
            )),
            ActivityKey::Named(key) => Ok(key.clone()),
        }
    }
}

impl From<u64> for ActivityKey {
    fn from(time: u64) -> Self {
        ActivityKey::Time(time)
    }
}

impl From<&str> for ActivityKey {
    fn from(key: &str) -> Self {
        ActivityKey::Named(key.to_string())
    }
}

impl From<String> for ActivityKey {
    fn from(key: String) -> Self {
        ActivityKey::Named(key)
    }
}

impl From<&String> for ActivityKey {
    fn from(key: &String) -> Self {
        ActivityKey::Named(key.clone())
    }
}

/// Day bucket containing `time`.
pub fn time_bucket(time: u64) -> u64 {
    time / BUCKET_WIDTH_SECS
}

/// Logical counter key for the day containing `time`.
pub fn time_bucket_key(time: u64) -> String {
    time_bucket(time).to_string()
}

/// Object holding `user`'s log for the day containing `time`.
pub fn user_log_key(user: &str, time: u64) -> ObjectId {
    user_log_bucket_key(user, time_bucket(time))
}

/// Object holding `user`'s log for day `bucket`.
pub fn user_log_bucket_key(user: &str, bucket: u64) -> ObjectId {
    ObjectId::new([LOGS_PREFIX.to_string(), user.to_string(), bucket.to_string()])
}

/// Object holding shard `chunk` of the counter tree `key` in generation 0.
pub fn chunk_key(key: &str, chunk: u32) -> ObjectId {
    generation_chunk_key(key, 0, chunk)
}

/// Object holding shard `chunk` of generation `generation` of `key`.
pub fn generation_chunk_key(key: &str, generation: u64, chunk: u32) -> ObjectId {
    if generation == 0 {
        return ObjectId::new([ACTIVITY_PREFIX.to_string(), key.to_string(), chunk.to_string()]);
    }
    ObjectId::new([
        ACTIVITY_PREFIX.to_string(),
        key.to_string(),
        format!("{}{}", GENERATION_PREFIX, generation),
        chunk.to_string(),
    ])
}

/// Where the live chunks of one counter tree are: how many, and which
/// generation of chunk objects holds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkLayout {
    pub count: u32,
    pub generation: u64,
}

impl ChunkLayout {
    pub fn new(count: u32, generation: u64) -> Self {
        Self { count, generation }
    }

    /// Layout of a key that was never repartitioned.
    pub fn initial(count: u32) -> Self {
        Self::new(count, 0)
    }

    pub fn chunk_key(&self, key: &str, chunk: u32) -> ObjectId {
        generation_chunk_key(key, self.generation, chunk)
    }

    pub fn contains(&self, chunk: u32) -> bool {
        chunk < self.count
    }
}

/// Object holding the chunk count of the counter tree `key`.
pub fn chunk_count_key(key: &str) -> ObjectId {
    ObjectId::new([ACTIVITY_PREFIX, key, CHUNK_COUNT_SEGMENT])
}

/// Every day bucket intersecting `[begin, end]`, ascending.
pub fn buckets_in_range(begin: u64, end: u64) -> impl Iterator<Item = u64> + Send + 'static {
    let first = time_bucket(begin);
    let last = time_bucket(end);
    let count = if begin > end { 0 } else { last - first + 1 };
    (0..count).map(move |offset| first + offset)
}

/// Start of day `bucket` in seconds.
pub fn bucket_start(bucket: u64) -> u64 {
    bucket.saturating_mul(BUCKET_WIDTH_SECS)
}
