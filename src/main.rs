use std::sync::Arc;

use anyhow::Context;
use session_tally::host::identity::ProcfsResolver;
use session_tally::host::pending::AtomicPendingCounters;
use session_tally::host::replay::run_session;
use session_tally::{UsageAggregator, UsageConfig};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

// Reads host events as JSON lines on stdin and writes the session summary
// when input ends or on Ctrl+C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => UsageConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => UsageConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let sink = config.build_sink().context("opening telemetry sink")?;
    let pending = Arc::new(AtomicPendingCounters::new());
    let mut aggregator = UsageAggregator::new(config.shell.clone(), sink, pending.clone());
    tracing::info!(activity = %aggregator.activity(), "session started");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let report = run_session(
        BufReader::new(tokio::io::stdin()),
        &mut aggregator,
        &pending,
        &ProcfsResolver,
        &config.host,
        shutdown,
    )
    .await
    .context("reading host events")?;

    tracing::info!(
        applied = report.applied,
        malformed = report.malformed,
        interrupted = report.interrupted,
        summary_written = report.summary_written,
        "session ended"
    );
    Ok(())
}
