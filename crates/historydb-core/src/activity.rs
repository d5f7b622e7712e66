//! Activity Payload
//!
//! One chunk of an activity counter tree holds a partial `user -> count`
//! mapping. The true aggregate for a logical key is the merge of every chunk.
//!
//! ## Merge Semantics
//!
//! Counts of users present on both sides are summed (saturating at
//! `u32::MAX`); users present on one side are taken verbatim. Merge is
//! associative and commutative, so chunks can be combined in any order.
//!
//! ## Encoding
//!
//! Chunks are stored as `bincode` of [`Activity`]. The map is a `BTreeMap`, so
//! an identical mapping always encodes to identical bytes, which keeps content
//! checksums stable across writers.

use crate::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partial or aggregated `user -> count` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub users: BTreeMap<String, u32>,
}

impl Activity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Count recorded for `user`, zero when absent.
    pub fn count(&self, user: &str) -> u32 {
        self.users.get(user).copied().unwrap_or(0)
    }

    /// Add one to `user`'s count.
    pub fn increment(&mut self, user: &str) {
        self.add(user, 1);
    }

    /// Add `amount` to `user`'s count.
    pub fn add(&mut self, user: &str, amount: u32) {
        let entry = self.users.entry(user.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &Activity) {
        for (user, count) in &other.users {
            self.add(user, *count);
        }
    }

    /// Merge owning both sides, reusing the larger map.
    pub fn merged(mut self, mut other: Activity) -> Activity {
        if self.users.len() < other.users.len() {
            std::mem::swap(&mut self, &mut other);
        }
        for (user, count) in other.users {
            let entry = self.users.entry(user).or_insert(0);
            *entry = entry.saturating_add(count);
        }
        self
    }

    /// Split into exactly `chunks` parts. Users are taken in sorted order and
    /// user `i` lands in part `i % chunks`, so the result is deterministic.
    ///
    /// `chunks` must be non-zero; zero yields an empty vector.
    pub fn split(&self, chunks: u32) -> Vec<Activity> {
        let mut parts = vec![Activity::default(); chunks as usize];
        if parts.is_empty() {
            return parts;
        }
        let n = parts.len();
        for (i, (user, count)) in self.users.iter().enumerate() {
            parts[i % n].users.insert(user.clone(), *count);
        }
        parts
    }

    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    /// Decode a stored chunk; an empty object decodes to an empty mapping.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Activity::default());
        }
        Ok(bincode::deserialize(data)?)
    }

    pub fn into_map(self) -> BTreeMap<String, u32> {
        self.users
    }
}

impl From<BTreeMap<String, u32>> for Activity {
    fn from(users: BTreeMap<String, u32>) -> Self {
        Self { users }
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for Activity {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut activity = Activity::default();
        for (user, count) in iter {
            let user = user.into();
            activity.add(&user, count);
        }
        activity
    }
}
