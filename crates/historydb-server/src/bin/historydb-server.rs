//! HistoryDB Server Binary
//!
//! # Example
//!
//! ```bash
//! export AWS_CONDITIONAL_PUT=etag
//! export HISTORYDB_LOG_LEVEL=NOTICE
//! historydb-server --config /etc/historydb/server.toml
//! ```
//!
//! Without `--config` the server runs with one in-memory replication group.
//! See `historydb_server::config` for the file format and the `HISTORYDB_*`
//! overrides.

use anyhow::Context;
use clap::Parser;
use historydb::Provider;
use historydb_observability::{logging, metrics};
use historydb_server::{create_router, serve, AppState, ServerConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "historydb-server", version, about = "HistoryDB HTTP server")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "HISTORYDB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    logging::init(&config.provider.log_level).context("Failed to install log subscriber")?;
    metrics::init();

    tracing::info!(
        config = ?args.config,
        bind = %config.bind_addr(),
        log_level = %logging::Severity::parse_lenient(&config.provider.log_level),
        "Starting HistoryDB server"
    );

    let provider = Provider::connect(&config.provider).context("Failed to connect provider")?;
    let router = create_router(AppState::new(provider));

    serve(router, &config.bind_addr())
        .await
        .with_context(|| format!("Server on {} failed", config.bind_addr()))?;
    Ok(())
}
