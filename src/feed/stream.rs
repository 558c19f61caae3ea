//! Event-stream connection manager with automatic reconnection.
//!
//! [`StreamManager`] owns at most one connection task. The task opens the
//! event source through an [`EventSourceConnector`], decodes each message into
//! a [`LiveTransaction`], and on any transport failure waits a fixed delay
//! before trying again. Retries never give up; only [`StreamManager::stop`]
//! ends the loop.

use crate::error::FeedError;
use crate::feed::subscribers::FeedEvent;
use crate::feed::FeedShared;
use crate::types::transaction::LiveTransaction;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default delay between a failure and the next connection attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Message payloads from an open event source. Dropping the stream closes it.
pub type EventStream = BoxStream<'static, Result<String, FeedError>>;

/// Opens connections to a server-sent event source
#[async_trait]
pub trait EventSourceConnector: Send + Sync + 'static {
    async fn open(&self) -> Result<EventStream, FeedError>;
}

/// Connection state, owned by the [`StreamManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamState::Disconnected => "disconnected",
            StreamState::Connecting => "connecting",
            StreamState::Connected => "connected",
            StreamState::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// State cell shared between the manager and its connection task
#[derive(Clone)]
struct StateCell {
    tx: Arc<watch::Sender<StreamState>>,
    shared: FeedShared,
}

impl StateCell {
    fn get(&self) -> StreamState {
        *self.tx.borrow()
    }

    /// Record a transition and notify subscribers. Every call is an event,
    /// including repeated `Reconnecting` after consecutive failures.
    fn transition(&self, next: StreamState) {
        let previous = self.tx.send_replace(next);
        debug!(from = %previous, to = %next, "Stream state transition");
        self.shared.subscribers.publish(&FeedEvent::State(next));
    }
}

/// Manages one live connection to the event source.
pub struct StreamManager {
    connector: Arc<dyn EventSourceConnector>,
    state: StateCell,
    reconnect_delay: Duration,
    task: Option<JoinHandle<()>>,
}

impl StreamManager {
    pub fn new(connector: Arc<dyn EventSourceConnector>, shared: FeedShared) -> Self {
        Self::with_reconnect_delay(connector, shared, DEFAULT_RECONNECT_DELAY)
    }

    pub fn with_reconnect_delay(
        connector: Arc<dyn EventSourceConnector>,
        shared: FeedShared,
        reconnect_delay: Duration,
    ) -> Self {
        let (tx, _rx) = watch::channel(StreamState::Disconnected);
        Self {
            connector,
            state: StateCell {
                tx: Arc::new(tx),
                shared,
            },
            reconnect_delay,
            task: None,
        }
    }

    pub fn current_state(&self) -> StreamState {
        self.state.get()
    }

    /// Receiver that observes every state change
    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Begin connecting. No-op if a connection task is already running.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Stream manager already running");
            return;
        }

        self.state.transition(StreamState::Connecting);

        let connector = self.connector.clone();
        let state = self.state.clone();
        let delay = self.reconnect_delay;
        self.task = Some(tokio::spawn(run_connection_loop(connector, state, delay)));
        info!(reconnect_delay_ms = delay.as_millis() as u64, "Stream manager started");
    }

    /// Cancel any pending retry, close any open connection and go to
    /// `Disconnected`. Waits for the connection task to finish, so no callback
    /// fires after this returns. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Stream task ended abnormally");
                }
            }
            info!("Stream manager stopped");
        }

        if self.state.get() != StreamState::Disconnected {
            self.state.transition(StreamState::Disconnected);
        }
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_connection_loop(
    connector: Arc<dyn EventSourceConnector>,
    state: StateCell,
    reconnect_delay: Duration,
) {
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        let failure = match connector.open().await {
            Ok(stream) => {
                state.transition(StreamState::Connected);
                state.shared.metrics.record_connection();
                info!(attempt, "Event stream connected");
                attempt = 0;
                consume(stream, &state).await
            }
            Err(e) => e,
        };

        state.transition(StreamState::Reconnecting);
        state.shared.metrics.record_reconnect();
        warn!(
            error = %failure,
            attempt,
            retry_in_ms = reconnect_delay.as_millis() as u64,
            "Event stream unavailable, scheduling reconnect"
        );

        tokio::time::sleep(reconnect_delay).await;
    }
}

/// Read messages until the connection fails. The stream is dropped (closed)
/// before this returns.
async fn consume(mut stream: EventStream, state: &StateCell) -> FeedError {
    while let Some(message) = stream.next().await {
        match message {
            Ok(payload) => handle_message(&payload, state),
            Err(e) => return e,
        }
    }
    FeedError::Closed
}

fn handle_message(payload: &str, state: &StateCell) {
    match serde_json::from_str::<LiveTransaction>(payload) {
        Ok(tx) => {
            debug!(
                transaction_id = %tx.id,
                risk_score = tx.risk_score,
                status = %tx.status,
                "Live transaction received"
            );
            state.shared.metrics.record_live(&tx);
            state.shared.buffer.push(tx.clone());
            state.shared.subscribers.publish(&FeedEvent::Live(tx));
        }
        Err(e) => {
            state.shared.metrics.record_malformed();
            debug!(error = %e, "Discarding malformed stream message");
        }
    }
}
