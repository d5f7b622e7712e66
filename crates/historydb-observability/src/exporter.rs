//! Prometheus Exporter
//!
//! Serves the HistoryDB registry at `/metrics`. The metrics are registered on
//! the first scrape if the process never called [`metrics::init`], so a front
//! end only has to merge [`create_metrics_router`] into its router.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};

use crate::metrics::{self, REGISTRY};

/// Text exposition of every registered HistoryDB metric.
pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    metrics::init();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

/// Handler for Prometheus metrics endpoint
pub async fn metrics_handler() -> Response {
    match render() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", TextEncoder::new().format_type())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Router serving `/metrics`, generic over the state of the router it is
/// merged into.
pub fn create_metrics_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/metrics", get(metrics_handler))
}
