//! HistoryDB Observability
//!
//! Provides logging setup and metrics for HistoryDB.
//!
//! # Features
//!
//! - Severity names `DATA`, `ERROR`, `INFO`, `NOTICE`, `DEBUG` mapped onto
//!   tracing levels
//! - Prometheus metrics for the substrate, the counter engine and the
//!   chunk-count cache
//! - `/metrics` endpoint
//!
//! # Usage
//!
//! ```no_run
//! use historydb_observability::{exporter, logging, metrics};
//!
//! logging::init("notice").unwrap();
//! metrics::init();
//!
//! let metrics_router: axum::Router = exporter::create_metrics_router();
//! ```

pub mod exporter;
pub mod logging;
pub mod metrics;

pub use logging::Severity;
pub use metrics::{init as init_metrics, REGISTRY};

/// Initialize metrics; logging is installed separately since it is global
/// to the process and owned by the binary.
pub fn init() {
    metrics::init();
}
