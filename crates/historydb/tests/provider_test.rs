//! Provider tests: configuration, session parameters and per-call sessions.

mod common;

use common::{engine_config, memory_substrate, provider_over};
use historydb::{EngineError, Provider, ProviderConfig};
use historydb_storage::StorageError;

#[tokio::test]
async fn test_connect_from_toml() {
    let config: ProviderConfig = toml::from_str(
        r#"
        groups = [2]
        min_writes = 3
        log_level = "NOTICE"

        [[substrate.replicas]]
        group = 1
        backend = "memory"

        [[substrate.replicas]]
        group = 2
        backend = "memory"

        [engine]
        default_chunk_count = 3
        "#,
    )
    .unwrap();
    assert_eq!(config.engine.max_cas_attempts, 5);
    assert_eq!(config.cache.ttl_ms, 30_000);

    let provider = Provider::connect(&config).unwrap();
    let params = provider.session_parameters();
    assert_eq!(params.groups(), &[2]);
    assert_eq!(params.min_writes(), 1);

    let outcome = provider.add_user_activity("alice", 10, "hello", None).await;
    assert!(outcome.is_complete(), "{:?}", outcome);
    assert_eq!(provider.session().chunk_count("0").await.unwrap(), 3);
}

#[tokio::test]
async fn test_connect_defaults_to_every_replica() {
    let config: ProviderConfig = toml::from_str(
        r#"
        [[substrate.replicas]]
        group = 1
        backend = "memory"

        [[substrate.replicas]]
        group = 4
        backend = "memory"
        "#,
    )
    .unwrap();

    let provider = Provider::connect(&config).unwrap();
    assert_eq!(provider.session_parameters().groups(), &[1, 4]);
    assert_eq!(provider.session_parameters().min_writes(), 1);
}

#[tokio::test]
async fn test_connect_rejects_duplicate_groups() {
    let config: ProviderConfig = toml::from_str(
        r#"
        [[substrate.replicas]]
        group = 1
        backend = "memory"

        [[substrate.replicas]]
        group = 1
        backend = "memory"
        "#,
    )
    .unwrap();

    assert!(matches!(
        Provider::connect(&config),
        Err(EngineError::Storage(StorageError::Config(_)))
    ));
}

#[tokio::test]
async fn test_set_session_parameters_clamps_min_writes() {
    let provider = Provider::new(memory_substrate(&[1, 2]), engine_config(4));

    let applied = provider.set_session_parameters(vec![1, 2], 7);
    assert_eq!(applied.min_writes(), 2);
    assert_eq!(provider.session_parameters(), applied);

    let applied = provider.set_session_parameters(vec![2], 1);
    assert_eq!(applied.groups(), &[2]);
    assert_eq!(provider.session().parameters(), &applied);
}

#[tokio::test]
async fn test_repeated_group_is_one_replica() {
    let provider = provider_over(memory_substrate(&[1]), &[1, 1], 2, 4);
    let params = provider.session_parameters();
    assert_eq!(params.groups(), &[1]);
    assert_eq!(params.min_writes(), 1);

    let outcome = provider.add_user_activity("alice", 10, "X", None).await;
    assert!(outcome.is_complete());

    let logs = provider.get_user_logs("alice", 0, 10).await.unwrap();
    assert_eq!(logs, vec![bytes::Bytes::from_static(b"X")]);
    assert_eq!(
        provider.get_active_users(10u64).await.unwrap().get("alice"),
        Some(&1)
    );
}

#[tokio::test]
async fn test_sessions_snapshot_parameters() {
    let provider = Provider::new(memory_substrate(&[1, 2]), engine_config(4));
    provider.set_session_parameters(vec![1], 1);

    let before = provider.session();
    provider.set_session_parameters(vec![1, 2], 2);
    let after = provider.session();

    assert_eq!(before.parameters().groups(), &[1]);
    assert_eq!(after.parameters().groups(), &[1, 2]);
    assert_eq!(after.parameters().min_writes(), 2);
}

#[tokio::test]
async fn test_operations_without_groups_fail() {
    let provider = Provider::new(memory_substrate(&[1]), engine_config(4));

    let err = provider.get_active_users("k").await.unwrap_err();
    assert!(matches!(err, EngineError::Storage(StorageError::NoGroups)));

    let outcome = provider.add_user_activity("alice", 1, "x", None).await;
    assert!(!outcome.log_written());
    assert!(!outcome.statistics_updated());
}

#[tokio::test]
async fn test_unknown_group_is_reported() {
    let provider = Provider::new(memory_substrate(&[1]), engine_config(4));
    provider.set_session_parameters(vec![9], 1);

    let err = provider.get_user_logs("alice", 0, 1).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Storage(StorageError::UnknownGroup(9))
    ));
}
