//! HistoryDB HTTP Server
//!
//! Thin axum front end over a [`Provider`]. Every request runs in a fresh
//! engine session; the handlers only translate parameters and results.
//!
//! ## Endpoints
//!
//! | Method | Path                | Parameters                                   |
//! |--------|---------------------|----------------------------------------------|
//! | GET    | `/`                 | help page                                    |
//! | GET    | `/test`             | liveness, always 200                         |
//! | GET/POST | `/add_activity`   | `user`, `data`, optional `key`, `timestamp`  |
//! | GET    | `/get_active_users` | `key` or `timestamp`                         |
//! | GET    | `/get_user_logs`    | `user`, `begin_time`, `end_time`             |
//! | POST   | `/repartition`      | `key` or `timestamp`, `chunks`, `new_key`    |
//! | GET    | `/metrics`          | Prometheus exposition                        |
//!
//! Malformed requests answer 400, engine failures 500.

use axum::{
    routing::{get, post},
    Router,
};
use historydb::Provider;
use historydb_observability::exporter::create_metrics_router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod handlers;
pub mod models;

pub use config::{ConfigError, ServerConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<Provider>,
}

impl AppState {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root::help))
        .route("/test", get(handlers::root::test))
        .route(
            "/add_activity",
            get(handlers::activity::add_activity).post(handlers::activity::add_activity_form),
        )
        .route("/get_active_users", get(handlers::activity::get_active_users))
        .route("/get_user_logs", get(handlers::logs::get_user_logs))
        .route("/repartition", post(handlers::repartition::repartition))
        .with_state(state)
        .merge(create_metrics_router::<()>())
        .fallback(handlers::root::not_found)
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `addr` until the process is stopped.
pub async fn serve(router: Router, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "HistoryDB server listening");
    axum::serve(listener, router).await
}
