//! Replication and quorum tests for the replicated substrate.
//!
//! Replicas are `InMemory` stores; faulty groups are wrapped in
//! `FaultyObjectStore` and switched off mid-test.

use bytes::Bytes;
use historydb_core::ObjectId;
use historydb_storage::{
    AppendOutcome, ChunkStore, FaultyObjectStore, ReplicatedObjectStore, Substrate, WriteOutcome,
    WritePolicy,
};
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

struct Cluster {
    substrate: Arc<ReplicatedObjectStore>,
    faulty: Vec<Arc<FaultyObjectStore>>,
}

/// Groups 1..=n, each behind a fault switch.
fn cluster(n: u32) -> Cluster {
    let mut substrate = ReplicatedObjectStore::new();
    let mut faulty = Vec::new();
    for group in 1..=n {
        let replica = Arc::new(FaultyObjectStore::new(Arc::new(InMemory::new())));
        substrate = substrate.with_replica(group, replica.clone() as Arc<dyn ObjectStore>);
        faulty.push(replica);
    }
    Cluster {
        substrate: Arc::new(substrate),
        faulty,
    }
}

fn object(name: &str) -> ObjectId {
    ObjectId::new(["quorum", name])
}

// ============================================================================
// Quorum Enforcement
// ============================================================================

#[tokio::test]
async fn test_write_below_quorum_is_failure_even_if_persisted() {
    let cluster = cluster(3);
    cluster.faulty[1].set_offline(true);
    cluster.faulty[2].set_offline(true);

    let policy = WritePolicy::new(vec![1, 2, 3], 2);
    let outcome = cluster
        .substrate
        .write_cas(&object("k"), None, Bytes::from_static(b"v"), &policy)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WriteOutcome::QuorumNotMet {
            acks: 1,
            required: 2
        }
    );

    // The primary kept the value
    let stored = cluster
        .substrate
        .read(&object("k"), &[1])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data, Bytes::from_static(b"v"));
}

#[tokio::test]
async fn test_write_meets_quorum_with_one_replica_down() {
    let cluster = cluster(3);
    cluster.faulty[2].set_offline(true);

    let policy = WritePolicy::new(vec![1, 2, 3], 2);
    let outcome = cluster
        .substrate
        .write_cas(&object("k"), None, Bytes::from_static(b"v"), &policy)
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Written { acks: 2 });
}

#[tokio::test]
async fn test_append_quorum() {
    let cluster = cluster(2);
    cluster.faulty[1].set_reject_writes(true);

    let strict = WritePolicy::new(vec![1, 2], 2);
    let outcome = cluster
        .substrate
        .append(&object("log"), Bytes::from_static(b"x"), &strict)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        AppendOutcome::QuorumNotMet {
            acks: 1,
            required: 2
        }
    );

    let relaxed = WritePolicy::new(vec![1, 2], 1);
    let outcome = cluster
        .substrate
        .append(&object("log"), Bytes::from_static(b"y"), &relaxed)
        .await
        .unwrap();
    assert_eq!(outcome, AppendOutcome::Appended { acks: 1 });
}

// ============================================================================
// Failover
// ============================================================================

#[tokio::test]
async fn test_primary_fails_over_to_next_group() {
    let cluster = cluster(2);
    let policy = WritePolicy::new(vec![1, 2], 1);

    cluster
        .substrate
        .write_cas(&object("k"), None, Bytes::from_static(b"v1"), &policy)
        .await
        .unwrap();

    cluster.faulty[0].set_offline(true);

    // Reads fall through to group 2
    let stored = cluster
        .substrate
        .read(&object("k"), &[1, 2])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data, Bytes::from_static(b"v1"));

    // Group 2 evaluates the guard while group 1 is down
    let outcome = cluster
        .substrate
        .write_cas(
            &object("k"),
            Some(stored.checksum),
            Bytes::from_static(b"v2"),
            &policy,
        )
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Written { acks: 1 });
    assert!(cluster.faulty[0].injected_faults() > 0);
}

#[tokio::test]
async fn test_read_with_every_group_down_is_error() {
    let cluster = cluster(2);
    cluster.faulty[0].set_offline(true);
    cluster.faulty[1].set_offline(true);

    assert!(cluster.substrate.read(&object("k"), &[1, 2]).await.is_err());
}

#[tokio::test]
async fn test_no_primary_reachable_is_quorum_failure() {
    let cluster = cluster(2);
    cluster.faulty[0].set_offline(true);
    cluster.faulty[1].set_offline(true);

    let outcome = cluster
        .substrate
        .write_cas(
            &object("k"),
            None,
            Bytes::from_static(b"v"),
            &WritePolicy::new(vec![1, 2], 1),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WriteOutcome::QuorumNotMet {
            acks: 0,
            required: 1
        }
    );
}

// ============================================================================
// Chunk Store over a degraded cluster
// ============================================================================

#[tokio::test]
async fn test_chunk_write_reports_quorum_failure() {
    let cluster = cluster(2);
    cluster.faulty[1].set_reject_writes(true);

    let chunks = ChunkStore::new(cluster.substrate.clone(), WritePolicy::new(vec![1, 2], 2));
    let mut chunk = chunks.read_chunk("19675", 0, 0).await.unwrap();
    chunk.activity.increment("alice");

    let outcome = chunks
        .write_chunk_cas("19675", 0, 0, chunk.checksum, &chunk.activity)
        .await
        .unwrap();
    assert!(matches!(outcome, WriteOutcome::QuorumNotMet { acks: 1, .. }));
}
