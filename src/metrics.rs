//! Feed statistics: event counts, connectivity and score distribution.

use crate::types::transaction::LiveTransaction;
use crate::types::verdict::{RiskLevel, ScoredTransaction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the live feed
pub struct FeedMetrics {
    /// Transactions received over the stream
    pub live_events: AtomicU64,
    /// Stream payloads that failed to decode
    malformed: AtomicU64,
    /// Successful stream opens
    connections: AtomicU64,
    /// Failures followed by a scheduled reconnect
    reconnects: AtomicU64,
    polls_ok: AtomicU64,
    polls_failed: AtomicU64,
    /// Transactions scored locally (batch records without a verdict, simulator runs)
    pub scored_locally: AtomicU64,
    by_level: RwLock<HashMap<RiskLevel, u64>>,
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self {
            live_events: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            connections: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            polls_ok: AtomicU64::new(0),
            polls_failed: AtomicU64::new(0),
            scored_locally: AtomicU64::new(0),
            by_level: RwLock::new(HashMap::new()),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    pub fn record_live(&self, tx: &LiveTransaction) {
        self.live_events.fetch_add(1, Ordering::Relaxed);
        self.record_score(tx.risk_level, tx.risk_score);
    }

    pub fn record_scored(&self, scored: &ScoredTransaction) {
        self.scored_locally.fetch_add(1, Ordering::Relaxed);
        self.record_score(scored.verdict.risk_level, scored.verdict.risk_score);
    }

    fn record_score(&self, level: RiskLevel, score: f64) {
        if let Ok(mut by_level) = self.by_level.write() {
            *by_level.entry(level).or_insert(0) += 1;
        }

        let bucket = (score.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll(&self, success: bool) {
        if success {
            self.polls_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.polls_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn malformed_messages(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// (successful, failed) poll counts
    pub fn polls(&self) -> (u64, u64) {
        (
            self.polls_ok.load(Ordering::Relaxed),
            self.polls_failed.load(Ordering::Relaxed),
        )
    }

    /// Live events per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.live_events.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    pub fn get_counts_by_level(&self) -> HashMap<RiskLevel, u64> {
        self.by_level.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let live = self.live_events.load(Ordering::Relaxed);
        let local = self.scored_locally.load(Ordering::Relaxed);
        let (polls_ok, polls_failed) = self.polls();
        let by_level = self.get_counts_by_level();
        let score_dist = self.get_score_distribution();
        let total: u64 = score_dist.iter().sum();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║                FRAUD FEED - METRICS SUMMARY                  ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Live Events: {:>8}  │  Throughput: {:>6.1} tx/s            ║",
            live,
            self.get_throughput()
        );
        info!(
            "║ Scored Locally: {:>5}  │  Malformed Payloads: {:>6}         ║",
            local,
            self.malformed_messages()
        );
        info!(
            "║ Connections: {:>8}  │  Reconnects: {:>6}                   ║",
            self.connections(),
            self.reconnects()
        );
        info!(
            "║ Polls OK: {:>11}  │  Polls Failed: {:>6}                 ║",
            polls_ok, polls_failed
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Transactions by Risk Level:                                  ║");
        let mut levels: Vec<_> = by_level.into_iter().collect();
        levels.sort_by_key(|(level, _)| std::cmp::Reverse(*level));
        for (level, count) in levels {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)                                ║", level.as_str(), count, pct);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Risk Score Distribution:                                     ║");
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for FeedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<FeedMetrics>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<FeedMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Start the periodic reporting task. The first tick is skipped.
    pub async fn start(self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::verdict::Decision;
    use chrono::Utc;

    fn live(score: f64, level: RiskLevel) -> LiveTransaction {
        LiveTransaction {
            id: "TXN-1".to_string(),
            merchant: "Netflix Subscription".to_string(),
            amount: 15.99,
            currency: "BRL".to_string(),
            risk_score: score,
            risk_level: level,
            status: Decision::from_score(score),
            location: "São Paulo, BR".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = FeedMetrics::new();

        metrics.record_live(&live(0.05, RiskLevel::Safe));
        metrics.record_live(&live(0.93, RiskLevel::Critical));
        metrics.record_malformed();
        metrics.record_poll(true);
        metrics.record_poll(false);
        metrics.record_poll(false);

        assert_eq!(metrics.live_events.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.malformed_messages(), 1);
        assert_eq!(metrics.polls(), (1, 2));

        let by_level = metrics.get_counts_by_level();
        assert_eq!(by_level.get(&RiskLevel::Critical), Some(&1));
        assert_eq!(by_level.get(&RiskLevel::Safe), Some(&1));
    }

    #[test]
    fn test_score_buckets() {
        let metrics = FeedMetrics::new();
        metrics.record_live(&live(0.99, RiskLevel::Critical));
        metrics.record_live(&live(1.0, RiskLevel::Critical));
        metrics.record_live(&live(0.01, RiskLevel::Safe));

        let dist = metrics.get_score_distribution();
        assert_eq!(dist[9], 2);
        assert_eq!(dist[0], 1);
    }
}
