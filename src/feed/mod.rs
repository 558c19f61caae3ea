//! Unified live feed: event stream preferred, polling as degraded mode.

pub mod buffer;
pub mod polling;
pub mod sse;
pub mod stream;
pub mod subscribers;

pub use buffer::EventBuffer;
pub use polling::{PollSettings, PollingFallbackCoordinator, SnapshotSource};
pub use sse::{SseConnector, SseDecoder};
pub use stream::{EventSourceConnector, EventStream, StreamManager, StreamState};
pub use subscribers::{FeedEvent, SubscriberRegistry, SubscriptionHandle};

use crate::client::ApiClient;
use crate::config::AppConfig;
use crate::metrics::FeedMetrics;
use crate::scoring::{RiskScoringEngine, SeededJitter};
use crate::types::transaction::LiveTransaction;
use crate::types::verdict::ScoredTransaction;
use anyhow::{Context, Result};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

/// State shared by the stream manager, the poller and the feed facade
#[derive(Clone)]
pub struct FeedShared {
    pub subscribers: Arc<SubscriberRegistry>,
    /// Stream events, newest first
    pub buffer: Arc<EventBuffer<LiveTransaction>>,
    pub metrics: Arc<FeedMetrics>,
    snapshot: Arc<RwLock<Option<Vec<ScoredTransaction>>>>,
}

impl FeedShared {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(SubscriberRegistry::new()),
            buffer: Arc::new(EventBuffer::new(buffer_capacity)),
            metrics: Arc::new(FeedMetrics::new()),
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    /// Latest polled batch (empty before the first successful poll)
    pub fn snapshot(&self) -> Vec<ScoredTransaction> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_default()
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub(crate) fn replace_snapshot(&self, batch: Vec<ScoredTransaction>) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Some(batch);
    }
}

/// Connectivity as shown to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Event stream connected
    Live,
    /// Stream down, at least one poll has succeeded
    Polling,
    /// Nothing has loaded yet
    Offline,
}

/// Feed facade: one subscription surface regardless of transport.
pub struct LiveFeed {
    shared: FeedShared,
    stream: StreamManager,
    snapshot_source: Arc<dyn SnapshotSource>,
    poll_settings: PollSettings,
    engine: RiskScoringEngine,
    poller: Option<PollingFallbackCoordinator>,
}

impl LiveFeed {
    /// Build a feed against the configured backend
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let connector = SseConnector::new(
            config.stream_url(),
            Duration::from_millis(config.stream.connect_timeout_ms),
            Duration::from_millis(config.stream.read_timeout_ms),
        )
        .context("Failed to build event stream client")?;
        let client = ApiClient::new(
            &config.api.base_url,
            Duration::from_millis(config.api.request_timeout_ms),
        )
        .context("Failed to build API client")?;

        let shared = FeedShared::new(config.stream.buffer_capacity);
        let stream = StreamManager::with_reconnect_delay(
            Arc::new(connector),
            shared.clone(),
            Duration::from_millis(config.stream.reconnect_delay_ms),
        );

        Ok(Self::with_parts(
            shared,
            stream,
            Arc::new(client),
            config.poll_settings(),
            RiskScoringEngine::with_rules(config.scoring.clone()),
        ))
    }

    /// Assemble a feed from explicit transports
    pub fn with_parts(
        shared: FeedShared,
        stream: StreamManager,
        snapshot_source: Arc<dyn SnapshotSource>,
        poll_settings: PollSettings,
        engine: RiskScoringEngine,
    ) -> Self {
        Self {
            shared,
            stream,
            snapshot_source,
            poll_settings,
            engine,
            poller: None,
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.shared.subscribers.unsubscribe(handle)
    }

    pub fn current_state(&self) -> StreamState {
        self.stream.current_state()
    }

    pub fn status(&self) -> FeedStatus {
        if self.current_state() == StreamState::Connected {
            FeedStatus::Live
        } else if self.shared.has_snapshot() {
            FeedStatus::Polling
        } else {
            FeedStatus::Offline
        }
    }

    /// Stream events, newest first
    pub fn recent(&self) -> Vec<LiveTransaction> {
        self.shared.buffer.snapshot()
    }

    pub fn latest_snapshot(&self) -> Vec<ScoredTransaction> {
        self.shared.snapshot()
    }

    pub fn metrics(&self) -> Arc<FeedMetrics> {
        self.shared.metrics.clone()
    }

    /// Start the stream and its polling fallback
    pub fn start(&mut self) {
        self.stream.start();

        if self.poller.is_none() {
            self.poller = Some(PollingFallbackCoordinator::spawn(
                self.snapshot_source.clone(),
                self.engine.clone(),
                Box::new(SeededJitter::from_entropy()),
                self.shared.clone(),
                self.stream.watch_state(),
                self.poll_settings,
            ));
        }
        info!("Live feed started");
    }

    /// Tear down both transports; no callback fires after this returns
    pub async fn stop(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop().await;
        }
        self.stream.stop().await;
        info!("Live feed stopped");
    }
}
