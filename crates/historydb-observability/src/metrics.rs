use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Once;

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Substrate Metrics
    // ============================================================================

    /// Replica requests by operation type
    pub static ref SUBSTRATE_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("historydb_substrate_requests_total", "Total replica requests"),
        &["operation"] // read, write_cas, append
    ).expect("metric can be created");

    /// Replica errors by type
    pub static ref SUBSTRATE_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("historydb_substrate_errors_total", "Total replica errors"),
        &["operation", "error_type"] // unavailable, conflict, exhausted
    ).expect("metric can be created");

    /// Replica request latency
    pub static ref SUBSTRATE_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new("historydb_substrate_latency_seconds", "Replica request latency in seconds")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["operation"]
    ).expect("metric can be created");

    /// Logical writes that collected fewer than min_writes acknowledgments
    pub static ref QUORUM_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("historydb_quorum_failures_total", "Total writes below the write quorum"),
        &["operation"]
    ).expect("metric can be created");

    // ============================================================================
    // Activity Metrics
    // ============================================================================

    /// Conditional chunk writes by outcome
    pub static ref CAS_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("historydb_cas_attempts_total", "Total conditional chunk writes"),
        &["outcome"] // written, mismatch, quorum_not_met
    ).expect("metric can be created");

    /// Counter increments by result
    pub static ref INCREMENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("historydb_increments_total", "Total activity increments"),
        &["result"] // ok, contended, failed
    ).expect("metric can be created");

    /// Chunks read per aggregation
    pub static ref AGGREGATE_CHUNKS: Histogram = Histogram::with_opts(
        HistogramOpts::new("historydb_aggregate_chunks", "Chunks merged per aggregation")
            .buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0])
    ).expect("metric can be created");

    /// Repartitions by result
    pub static ref REPARTITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("historydb_repartitions_total", "Total repartition operations"),
        &["result"]
    ).expect("metric can be created");

    // ============================================================================
    // Log Metrics
    // ============================================================================

    /// Log entries appended
    pub static ref LOG_APPENDS_TOTAL: IntCounter = IntCounter::new(
        "historydb_log_appends_total",
        "Total log entries appended"
    ).expect("metric can be created");

    /// Log payload bytes appended
    pub static ref LOG_BYTES_TOTAL: IntCounter = IntCounter::new(
        "historydb_log_bytes_total",
        "Total log payload bytes appended"
    ).expect("metric can be created");

    // ============================================================================
    // Cache Metrics
    // ============================================================================

    /// Chunk-count cache hits
    pub static ref CACHE_HITS_TOTAL: IntCounter = IntCounter::new(
        "historydb_cache_hits_total",
        "Total chunk-count cache hits"
    ).expect("metric can be created");

    /// Chunk-count cache misses
    pub static ref CACHE_MISSES_TOTAL: IntCounter = IntCounter::new(
        "historydb_cache_misses_total",
        "Total chunk-count cache misses"
    ).expect("metric can be created");

    /// Chunk-count cache entries
    pub static ref CACHE_ENTRIES: IntGauge = IntGauge::new(
        "historydb_cache_entries",
        "Current chunk-count cache entries"
    ).expect("metric can be created");

    // ============================================================================
    // Session Metrics
    // ============================================================================

    /// Replication groups in the current session parameters
    pub static ref SESSION_GROUPS: IntGauge = IntGauge::new(
        "historydb_session_groups",
        "Replication groups in use"
    ).expect("metric can be created");

    /// Effective min_writes after clamping
    pub static ref SESSION_MIN_WRITES: IntGauge = IntGauge::new(
        "historydb_session_min_writes",
        "Minimum acknowledged writes in use"
    ).expect("metric can be created");
}

/// Initialize metrics registry
/// Can be called multiple times safely (idempotent)
pub fn init() {
    INIT.call_once(|| {
        // Substrate metrics
        REGISTRY
            .register(Box::new(SUBSTRATE_REQUESTS_TOTAL.clone()))
            .expect("substrate_requests_total can be registered");
        REGISTRY
            .register(Box::new(SUBSTRATE_ERRORS_TOTAL.clone()))
            .expect("substrate_errors_total can be registered");
        REGISTRY
            .register(Box::new(SUBSTRATE_LATENCY.clone()))
            .expect("substrate_latency can be registered");
        REGISTRY
            .register(Box::new(QUORUM_FAILURES_TOTAL.clone()))
            .expect("quorum_failures_total can be registered");

        // Activity metrics
        REGISTRY
            .register(Box::new(CAS_ATTEMPTS_TOTAL.clone()))
            .expect("cas_attempts_total can be registered");
        REGISTRY
            .register(Box::new(INCREMENTS_TOTAL.clone()))
            .expect("increments_total can be registered");
        REGISTRY
            .register(Box::new(AGGREGATE_CHUNKS.clone()))
            .expect("aggregate_chunks can be registered");
        REGISTRY
            .register(Box::new(REPARTITIONS_TOTAL.clone()))
            .expect("repartitions_total can be registered");

        // Log metrics
        REGISTRY
            .register(Box::new(LOG_APPENDS_TOTAL.clone()))
            .expect("log_appends_total can be registered");
        REGISTRY
            .register(Box::new(LOG_BYTES_TOTAL.clone()))
            .expect("log_bytes_total can be registered");

        // Cache metrics
        REGISTRY
            .register(Box::new(CACHE_HITS_TOTAL.clone()))
            .expect("cache_hits_total can be registered");
        REGISTRY
            .register(Box::new(CACHE_MISSES_TOTAL.clone()))
            .expect("cache_misses_total can be registered");
        REGISTRY
            .register(Box::new(CACHE_ENTRIES.clone()))
            .expect("cache_entries can be registered");

        // Session metrics
        REGISTRY
            .register(Box::new(SESSION_GROUPS.clone()))
            .expect("session_groups can be registered");
        REGISTRY
            .register(Box::new(SESSION_MIN_WRITES.clone()))
            .expect("session_min_writes can be registered");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        init();
        assert!(!REGISTRY.gather().is_empty());
    }

    #[test]
    fn test_cas_metrics() {
        CAS_ATTEMPTS_TOTAL.with_label_values(&["test-written"]).inc();
        CAS_ATTEMPTS_TOTAL
            .with_label_values(&["test-mismatch"])
            .inc_by(2);

        assert_eq!(
            CAS_ATTEMPTS_TOTAL.with_label_values(&["test-written"]).get(),
            1
        );
        assert_eq!(
            CAS_ATTEMPTS_TOTAL.with_label_values(&["test-mismatch"]).get(),
            2
        );
    }

    #[test]
    fn test_session_gauges() {
        SESSION_GROUPS.set(3);
        SESSION_MIN_WRITES.set(2);

        assert_eq!(SESSION_GROUPS.get(), 3);
        assert_eq!(SESSION_MIN_WRITES.get(), 2);
    }
}
