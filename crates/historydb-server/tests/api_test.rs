//! Integration tests for the HistoryDB HTTP API
//!
//! Builds the real router over in-memory replicas and sends requests via
//! tower::ServiceExt.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::io::Write;
use tower::ServiceExt;

use historydb::Provider;
use historydb_core::keys::BUCKET_WIDTH_SECS;
use historydb_server::models::{AddActivityResponse, UserLogsResponse};
use historydb_server::{create_router, AppState, ServerConfig};

const DAY: u64 = BUCKET_WIDTH_SECS;

/// Router over one in-memory group.
fn test_app() -> axum::Router {
    let provider = Provider::connect(&ServerConfig::default().provider).unwrap();
    create_router(AppState::new(provider))
}

async fn send(app: &axum::Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

// ---------------------------------------------------------------
// Help and liveness
// ---------------------------------------------------------------

#[tokio::test]
async fn test_root_and_test_endpoints() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("add_activity"));

    let (status, _) = send(&app, "GET", "/test").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let app = test_app();
    let (status, _) = send(&app, "GET", "/no/such/thing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------
// Activity
// ---------------------------------------------------------------

#[tokio::test]
async fn test_add_activity_then_read_back() {
    let app = test_app();
    let t = 100 * DAY + 5;

    for user in ["alice", "bob", "alice"] {
        let (status, body) = send(
            &app,
            "GET",
            &format!("/add_activity?user={}&data=visit&timestamp={}", user, t),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let outcome: AddActivityResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            outcome,
            AddActivityResponse {
                log_written: true,
                statistics_updated: true
            }
        );
    }

    let (status, body) = send(&app, "GET", &format!("/get_active_users?timestamp={}", t)).await;
    assert_eq!(status, StatusCode::OK);
    let users: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(users, serde_json::json!({"alice": 2, "bob": 1}));

    let (_, body) = send(
        &app,
        "GET",
        &format!("/get_user_logs?user=alice&begin_time={}&end_time={}", t, t),
    )
    .await;
    let logs: UserLogsResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(logs.logs, vec!["visitvisit".to_string()]);
}

#[tokio::test]
async fn test_add_activity_with_key_and_form_body() {
    let app = test_app();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/add_activity")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("user=carol&data=hello+world&key=promo&timestamp=10"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // POST with parameters in the query string
    let (status, _) = send(&app, "POST", "/add_activity?user=dave&data=x&key=promo").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/get_active_users?key=promo").await;
    let users: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(users, serde_json::json!({"carol": 1, "dave": 1}));

    let (_, body) = send(&app, "GET", "/get_user_logs?user=carol&begin_time=0&end_time=10").await;
    let logs: UserLogsResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(logs.logs, vec!["hello world".to_string()]);
}

#[tokio::test]
async fn test_missing_parameters_are_400() {
    let app = test_app();

    for uri in [
        "/add_activity?data=x",
        "/add_activity?user=alice",
        "/add_activity?user=&data=x",
        "/get_active_users",
        "/get_active_users?key=",
        "/get_user_logs?user=alice&begin_time=0",
        "/add_activity?user=alice&data=x&timestamp=yesterday",
    ] {
        let (status, _) = send(&app, "GET", uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }

    let (status, _) = send(&app, "POST", "/repartition?key=k").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------
// Repartition
// ---------------------------------------------------------------

#[tokio::test]
async fn test_repartition_keeps_counts() {
    let app = test_app();
    for user in ["alice", "bob", "bob"] {
        let (status, _) = send(&app, "GET", &format!("/add_activity?user={}&data=x&key=k", user)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, "POST", "/repartition?key=k&chunks=2").await;
    assert_eq!(status, StatusCode::OK);
    let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["new_chunk_count"], 2);
    assert_eq!(report["users"], 2);

    let (status, _) = send(&app, "POST", "/repartition?key=k&chunks=3&new_key=k2").await;
    assert_eq!(status, StatusCode::OK);

    for key in ["k", "k2"] {
        let (_, body) = send(&app, "GET", &format!("/get_active_users?key={}", key)).await;
        let users: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(users, serde_json::json!({"alice": 1, "bob": 2}));
    }

    for chunks in ["0", "4294967295"] {
        let (status, _) = send(&app, "POST", &format!("/repartition?key=k&chunks={}", chunks)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "chunks={}", chunks);
    }
}

// ---------------------------------------------------------------
// Failures and metrics
// ---------------------------------------------------------------

#[tokio::test]
async fn test_engine_failure_is_500() {
    let provider = Provider::connect(&ServerConfig::default().provider).unwrap();
    provider.set_session_parameters(vec![42], 1);
    let app = create_router(AppState::new(provider));

    let (status, body) = send(&app, "GET", "/add_activity?user=alice&data=x&timestamp=1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let outcome: AddActivityResponse = serde_json::from_slice(&body).unwrap();
    assert!(!outcome.log_written);
    assert!(!outcome.statistics_updated);

    let (status, _) = send(&app, "GET", "/get_active_users?key=k").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    historydb_observability::metrics::init();
    let app = test_app();
    send(&app, "GET", "/add_activity?user=alice&data=x&timestamp=1").await;

    let (status, body) = send(&app, "GET", "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("historydb_log_appends_total"));
}

#[tokio::test]
async fn test_router_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        min_writes = 2

        [[substrate.replicas]]
        group = 1
        backend = "memory"

        [[substrate.replicas]]
        group = 2
        backend = "memory"
        "#
    )
    .unwrap();

    let config = ServerConfig::from_file(file.path()).unwrap();
    let provider = Provider::connect(&config.provider).unwrap();
    assert_eq!(provider.session_parameters().groups(), &[1, 2]);
    assert_eq!(provider.session_parameters().min_writes(), 2);

    let app = create_router(AppState::new(provider));
    let (status, _) = send(&app, "GET", "/add_activity?user=alice&data=x&key=k").await;
    assert_eq!(status, StatusCode::OK);
}
