//! Substrate Interface
//!
//! The engine sees storage as a flat object namespace replicated across
//! numbered groups. It needs exactly three primitives:
//!
//! - `read`: first answer across the requested groups, with the content
//!   checksum of what was read
//! - `write_cas`: replace an object only if its checksum still matches, then
//!   replicate and count acknowledgments against `min_writes`
//! - `append`: add bytes to the end of an object on every group
//!
//! [`ReplicatedObjectStore`](crate::replicated::ReplicatedObjectStore) is the
//! production implementation over `object_store`. Tests wrap it to inject
//! faults and interleavings.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use historydb_core::ObjectId;
use object_store::path::Path;
use sha2::{Digest, Sha256};
use std::fmt;

/// Replication group number.
pub type GroupId = u32;

/// SHA-256 of an object's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Checksum(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An object as read from one replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub checksum: Checksum,
}

impl StoredObject {
    pub fn new(data: Bytes) -> Self {
        let checksum = Checksum::of(&data);
        Self { data, checksum }
    }
}

/// Where a logical write goes and how many acknowledgments make it durable.
///
/// The first group is the primary: it evaluates write guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePolicy {
    pub groups: Vec<GroupId>,
    pub min_writes: usize,
}

impl WritePolicy {
    pub fn new(groups: Vec<GroupId>, min_writes: usize) -> Self {
        Self { groups, min_writes }
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { acks: usize },
    ChecksumMismatch,
    QuorumNotMet { acks: usize, required: usize },
}

/// Result of an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended { acks: usize },
    QuorumNotMet { acks: usize, required: usize },
}

#[async_trait]
pub trait Substrate: Send + Sync {
    /// Read `id` from the first group in `groups` that has it.
    async fn read(&self, id: &ObjectId, groups: &[GroupId]) -> Result<Option<StoredObject>>;

    /// Replace `id` with `data` if its checksum equals `expected`
    /// (`None`: the object must not exist yet).
    async fn write_cas(
        &self,
        id: &ObjectId,
        expected: Option<Checksum>,
        data: Bytes,
        policy: &WritePolicy,
    ) -> Result<WriteOutcome>;

    /// Append `data` to `id` on every group of the policy.
    async fn append(&self, id: &ObjectId, data: Bytes, policy: &WritePolicy)
        -> Result<AppendOutcome>;
}

/// Object-store path for an object id; each segment is escaped on its own.
pub fn object_path(id: &ObjectId) -> Path {
    Path::from_iter(id.segments().iter().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_tracks_content() {
        let a = Checksum::of(b"alice");
        assert_eq!(a, Checksum::of(b"alice"));
        assert_ne!(a, Checksum::of(b"alicf"));
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn test_object_path_escapes_segments() {
        let plain = object_path(&ObjectId::new(["logs", "alice", "3"]));
        assert_eq!(plain.as_ref(), "logs/alice/3");

        let tricky = object_path(&ObjectId::new(["logs", "a/b", "3"]));
        assert_eq!(tricky.parts().count(), 3);
        assert_ne!(tricky, object_path(&ObjectId::new(["logs", "a", "b", "3"])));
    }
}
