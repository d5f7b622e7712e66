//! Chunk Store
//!
//! Reads and conditionally writes the shard objects of activity counter trees,
//! and the per-key chunk-count record.
//!
//! ## Chunk-Count Record
//!
//! ```text
//! count (u32 LE)                          generation 0
//! count (u32 LE) | generation (u64 LE)    any generation
//! ```
//!
//! A chunk that was never written reads as an empty [`Activity`] with no
//! checksum; writing it with `expected = None` creates it. Every write carries
//! the checksum of the read it was derived from, so a writer that lost a race
//! gets `ChecksumMismatch` instead of clobbering the winner.

use crate::error::Result;
use crate::substrate::{Checksum, Substrate, WriteOutcome, WritePolicy};
use bytes::Bytes;
use historydb_core::keys::{chunk_count_key, generation_chunk_key};
use historydb_core::{Activity, ChunkLayout, Error as CoreError};
use std::sync::Arc;

/// One shard of a counter tree as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub key: String,
    pub generation: u64,
    pub index: u32,
    pub activity: Activity,
    /// `None` when the object does not exist yet
    pub checksum: Option<Checksum>,
}

/// The chunk-count record as read, with the checksum needed to replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCountRecord {
    pub layout: ChunkLayout,
    pub checksum: Checksum,
}

#[derive(Clone)]
pub struct ChunkStore {
    substrate: Arc<dyn Substrate>,
    policy: WritePolicy,
}

impl ChunkStore {
    pub fn new(substrate: Arc<dyn Substrate>, policy: WritePolicy) -> Self {
        Self { substrate, policy }
    }

    pub fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    pub async fn read_chunk(&self, key: &str, generation: u64, index: u32) -> Result<Chunk> {
        let id = generation_chunk_key(key, generation, index);
        let stored = self.substrate.read(&id, &self.policy.groups).await?;

        let (activity, checksum) = match stored {
            Some(object) => (Activity::decode(&object.data)?, Some(object.checksum)),
            None => (Activity::default(), None),
        };

        Ok(Chunk {
            key: key.to_string(),
            generation,
            index,
            activity,
            checksum,
        })
    }

    /// Replace chunk `index` of `key` if it still has checksum `expected`.
    pub async fn write_chunk_cas(
        &self,
        key: &str,
        generation: u64,
        index: u32,
        expected: Option<Checksum>,
        activity: &Activity,
    ) -> Result<WriteOutcome> {
        let id = generation_chunk_key(key, generation, index);
        let data = activity.encode()?;
        self.substrate
            .write_cas(&id, expected, data, &self.policy)
            .await
    }

    pub async fn read_chunk_count_record(&self, key: &str) -> Result<Option<ChunkCountRecord>> {
        let id = chunk_count_key(key);
        match self.substrate.read(&id, &self.policy.groups).await? {
            Some(object) => Ok(Some(ChunkCountRecord {
                layout: decode_layout(&object.data)?,
                checksum: object.checksum,
            })),
            None => Ok(None),
        }
    }

    /// Layout recorded for `key`, `None` when it never was repartitioned.
    pub async fn read_chunk_layout(&self, key: &str) -> Result<Option<ChunkLayout>> {
        Ok(self
            .read_chunk_count_record(key)
            .await?
            .map(|record| record.layout))
    }

    /// Chunk count recorded for `key`, `None` when it never was repartitioned.
    pub async fn read_chunk_count(&self, key: &str) -> Result<Option<u32>> {
        Ok(self.read_chunk_layout(key).await?.map(|layout| layout.count))
    }

    /// Switch `key` to `layout` if the record still has checksum `expected`.
    pub async fn write_chunk_count(
        &self,
        key: &str,
        expected: Option<Checksum>,
        layout: ChunkLayout,
    ) -> Result<WriteOutcome> {
        let id = chunk_count_key(key);
        self.substrate
            .write_cas(&id, expected, encode_layout(layout), &self.policy)
            .await
    }
}

fn encode_layout(layout: ChunkLayout) -> Bytes {
    let mut buf = Vec::with_capacity(12);
    buf.extend_from_slice(&layout.count.to_le_bytes());
    if layout.generation != 0 {
        buf.extend_from_slice(&layout.generation.to_le_bytes());
    }
    Bytes::from(buf)
}

fn decode_layout(data: &[u8]) -> Result<ChunkLayout> {
    match data.len() {
        4 | 12 => {
            let mut count = [0u8; 4];
            count.copy_from_slice(&data[..4]);
            let mut generation = [0u8; 8];
            if data.len() == 12 {
                generation.copy_from_slice(&data[4..]);
            }
            Ok(ChunkLayout::new(
                u32::from_le_bytes(count),
                u64::from_le_bytes(generation),
            ))
        }
        len => Err(CoreError::Codec(format!(
            "chunk count record must be 4 or 12 bytes, got {}",
            len
        ))
        .into()),
    }
}
