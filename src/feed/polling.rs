//! Polling fallback used while the event stream is down.

use crate::feed::stream::StreamState;
use crate::feed::subscribers::FeedEvent;
use crate::feed::FeedShared;
use crate::scoring::{JitterSource, RiskScoringEngine};
use crate::types::transaction::WireTransaction;
use crate::types::verdict::ScoredTransaction;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Request/response source of recent transactions.
///
/// `None` means the backend is unreachable or returned garbage.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    async fn recent_transactions(&self, limit: usize) -> Option<Vec<WireTransaction>>;
}

/// Polling cadence for one consumer
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub batch_limit: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(6),
            batch_limit: 20,
        }
    }
}

/// Polls the batch endpoint whenever the stream is not `Connected`.
///
/// The polling task is owned by this value: dropping it or calling
/// [`stop`](Self::stop) cancels the timer.
pub struct PollingFallbackCoordinator {
    task: Option<JoinHandle<()>>,
}

impl PollingFallbackCoordinator {
    pub fn spawn(
        source: Arc<dyn SnapshotSource>,
        engine: RiskScoringEngine,
        jitter: Box<dyn JitterSource>,
        shared: FeedShared,
        stream_state: watch::Receiver<StreamState>,
        settings: PollSettings,
    ) -> Self {
        info!(
            interval_ms = settings.interval.as_millis() as u64,
            batch_limit = settings.batch_limit,
            "Polling fallback started"
        );

        let poller = Poller {
            source,
            engine,
            jitter,
            shared,
            settings,
        };
        Self {
            task: Some(tokio::spawn(poller.run(stream_state))),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the polling timer and wait for the task to exit
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Polling task ended abnormally");
                }
            }
            info!("Polling fallback stopped");
        }
    }
}

impl Drop for PollingFallbackCoordinator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Poller {
    source: Arc<dyn SnapshotSource>,
    engine: RiskScoringEngine,
    jitter: Box<dyn JitterSource>,
    shared: FeedShared,
    settings: PollSettings,
}

impl Poller {
    async fn run(mut self, mut state: watch::Receiver<StreamState>) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let connected = *state.borrow_and_update() == StreamState::Connected;
            if connected {
                debug!("Stream connected, polling paused");
                let resumed = state.wait_for(|s| *s != StreamState::Connected).await.is_ok();
                if !resumed {
                    break;
                }
                debug!("Stream lost, polling resumed");
                // poll now, next tick one full interval later
                ticker.reset();
            } else {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }
            }

            let connected = *state.borrow() == StreamState::Connected;
            if connected {
                continue;
            }
            self.poll_once().await;
        }

        debug!("Stream manager gone, polling task exiting");
    }

    async fn poll_once(&mut self) {
        match self.source.recent_transactions(self.settings.batch_limit).await {
            Some(batch) => {
                let snapshot: Vec<ScoredTransaction> =
                    batch.into_iter().map(|wire| self.resolve(wire)).collect();
                debug!(count = snapshot.len(), "Polled transaction snapshot");

                self.shared.metrics.record_poll(true);
                self.shared.replace_snapshot(snapshot.clone());
                self.shared.subscribers.publish(&FeedEvent::Snapshot(snapshot));
            }
            None => {
                // previous snapshot stays in place
                self.shared.metrics.record_poll(false);
                debug!("Snapshot fetch failed, backend not yet online");
            }
        }
    }

    /// Keep the server's verdict when present, otherwise score locally
    fn resolve(&mut self, wire: WireTransaction) -> ScoredTransaction {
        let (transaction, verdict) = wire.into_parts();
        match verdict {
            Some(verdict) => ScoredTransaction::new(transaction, verdict),
            None => {
                let verdict = self.engine.score_transaction(&transaction, &mut self.jitter);
                let scored = ScoredTransaction::new(transaction, verdict);
                self.shared.metrics.record_scored(&scored);
                scored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::NeutralJitter;
    use crate::types::transaction::{Merchant, Transaction};
    use crate::types::verdict::Decision;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Counts fetches and records whether the stream was connected at the time
    struct CountingSource {
        fetches: AtomicUsize,
        fetched_while_connected: AtomicBool,
        online: AtomicBool,
        state: watch::Receiver<StreamState>,
    }

    impl CountingSource {
        fn new(state: watch::Receiver<StreamState>) -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicUsize::new(0),
                fetched_while_connected: AtomicBool::new(false),
                online: AtomicBool::new(true),
                state,
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        async fn recent_transactions(&self, limit: usize) -> Option<Vec<WireTransaction>> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if *self.state.borrow() == StreamState::Connected {
                self.fetched_while_connected.store(true, Ordering::SeqCst);
            }
            if !self.online.load(Ordering::SeqCst) {
                return None;
            }
            let batch = (0..limit.min(3))
                .map(|i| WireTransaction {
                    transaction: Transaction::new(
                        format!("TXN-{n}-{i}"),
                        12_000.0,
                        Merchant {
                            name: "Western Union".to_string(),
                            category: "Wire Transfer".to_string(),
                            mcc: "4829".to_string(),
                            country: "NG".to_string(),
                        },
                    ),
                    verdict: None,
                })
                .collect();
            Some(batch)
        }
    }

    fn settings() -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(2),
            batch_limit: 3,
        }
    }

    fn spawn(
        source: Arc<CountingSource>,
        shared: &FeedShared,
        state: watch::Receiver<StreamState>,
    ) -> PollingFallbackCoordinator {
        PollingFallbackCoordinator::spawn(
            source,
            RiskScoringEngine::new(),
            Box::new(NeutralJitter),
            shared.clone(),
            state,
            settings(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_while_disconnected() {
        let (state_tx, state_rx) = watch::channel(StreamState::Disconnected);
        let shared = FeedShared::new(10);
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let sink = snapshots.clone();
        shared.subscribers.subscribe(move |event| {
            if let FeedEvent::Snapshot(batch) = event {
                sink.lock().unwrap().push(batch.len());
            }
        });

        let source = CountingSource::new(state_rx.clone());
        let mut poller = spawn(source.clone(), &shared, state_rx);

        // immediate first poll, then one per interval
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.fetches(), 1);
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(source.fetches(), 3);
        assert_eq!(*snapshots.lock().unwrap(), vec![3, 3, 3]);

        // unscored records were run through the engine
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].verdict.decision, Decision::Blocked);

        poller.stop().await;
        drop(state_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_while_connected_and_resumes() {
        let (state_tx, state_rx) = watch::channel(StreamState::Connecting);
        let shared = FeedShared::new(10);
        let source = CountingSource::new(state_rx.clone());
        let mut poller = spawn(source.clone(), &shared, state_rx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.fetches(), 1);

        state_tx.send_replace(StreamState::Connected);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(source.fetches(), 1);

        state_tx.send_replace(StreamState::Reconnecting);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.fetches(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.fetches(), 3);
        assert!(!source.fetched_while_connected.load(Ordering::SeqCst));

        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_previous_snapshot() {
        let (_state_tx, state_rx) = watch::channel(StreamState::Disconnected);
        let shared = FeedShared::new(10);
        let source = CountingSource::new(state_rx.clone());
        let mut poller = spawn(source.clone(), &shared, state_rx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let first: Vec<String> = shared.snapshot().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(first.len(), 3);

        source.online.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(source.fetches(), 3);

        let after: Vec<String> = shared.snapshot().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(first, after);
        assert_eq!(shared.metrics.polls(), (1, 2));

        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (_state_tx, state_rx) = watch::channel(StreamState::Disconnected);
        let shared = FeedShared::new(10);
        let source = CountingSource::new(state_rx.clone());

        {
            let _poller = spawn(source.clone(), &shared, state_rx);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let fetches = source.fetches();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(source.fetches(), fetches);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_stream_manager_gone() {
        let (state_tx, state_rx) = watch::channel(StreamState::Disconnected);
        let shared = FeedShared::new(10);
        let source = CountingSource::new(state_rx.clone());
        let poller = spawn(source.clone(), &shared, state_rx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(state_tx);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!poller.is_running());
    }
}
