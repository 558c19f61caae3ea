//! Fraud Feed - Main Entry Point
//!
//! Follows the live scored-transaction feed, falling back to polling while the
//! event stream is down, and logs every event until Ctrl-C.

use anyhow::Result;
use fraud_feed::{
    client::ApiClient,
    config::{AppConfig, LoggingConfig},
    feed::{FeedEvent, LiveFeed},
    metrics::MetricsReporter,
    types::RiskLevel,
};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraud_feed={}", logging.level).parse()?);

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Fraud Feed");
    info!(
        backend = %config.api.base_url,
        stream = %config.stream_url(),
        reconnect_delay_ms = config.stream.reconnect_delay_ms,
        poll_interval_ms = config.polling.interval_ms,
        "Configuration loaded successfully"
    );

    // Health probe is informational only; the feed degrades on its own
    let client = ApiClient::new(
        &config.api.base_url,
        Duration::from_millis(config.api.request_timeout_ms),
    )?;
    match client.health().await {
        Some(health) if health.is_healthy() => info!("Backend healthy"),
        Some(health) => warn!(status = %health.status, "Backend reports degraded health"),
        None => warn!("Backend not yet online, feed will retry"),
    }

    let mut feed = LiveFeed::from_config(&config)?;

    feed.subscribe(|event| match event {
        FeedEvent::Live(tx) => {
            if tx.risk_level >= RiskLevel::High {
                warn!(
                    transaction_id = %tx.id,
                    merchant = %tx.merchant,
                    amount = tx.amount,
                    risk_score = tx.risk_score,
                    risk_level = %tx.risk_level,
                    status = %tx.status,
                    "High-risk transaction"
                );
            } else {
                debug!(
                    transaction_id = %tx.id,
                    risk_score = tx.risk_score,
                    status = %tx.status,
                    "Transaction received"
                );
            }
        }
        FeedEvent::Snapshot(batch) => {
            let flagged = batch.iter().filter(|s| s.is_fraud()).count();
            info!(count = batch.len(), flagged, "Polled snapshot");
        }
        FeedEvent::State(state) => info!(state = %state, "Stream state changed"),
    });

    // Start metrics reporter
    let reporter = MetricsReporter::new(feed.metrics(), config.metrics.report_interval_secs);
    let reporter = tokio::spawn(reporter.start());

    feed.start();

    tokio::signal::ctrl_c().await?;

    info!("Feed shutting down...");
    reporter.abort();
    feed.stop().await;
    feed.metrics().print_summary();

    Ok(())
}
