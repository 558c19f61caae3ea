//! Subscriber registry for feed events

use crate::feed::stream::StreamState;
use crate::types::transaction::LiveTransaction;
use crate::types::verdict::ScoredTransaction;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Event delivered to feed subscribers, whichever transport produced it
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// One scored transaction pushed over the stream
    Live(LiveTransaction),
    /// Full polled batch; replaces any previous snapshot
    Snapshot(Vec<ScoredTransaction>),
    /// Stream connection state changed
    State(StreamState),
}

type Callback = Arc<dyn Fn(&FeedEvent) + Send + Sync>;

/// Opaque handle returned by [`SubscriberRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// Callback registry.
///
/// Callbacks run outside the registry lock, so a callback may subscribe or
/// unsubscribe without deadlocking.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(SubscriptionHandle, Callback)>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((handle, Arc::new(callback)));
        handle
    }

    /// Remove a subscription. Returns false if the handle was unknown.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut callbacks = self.lock();
        let before = callbacks.len();
        callbacks.retain(|(h, _)| *h != handle);
        callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every subscriber in subscription order.
    ///
    /// A panicking callback is logged and skipped; it never unwinds into the
    /// task that published the event.
    pub fn publish(&self, event: &FeedEvent) {
        let callbacks: Vec<(SubscriptionHandle, Callback)> = self.lock().clone();
        for (handle, callback) in callbacks {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(subscription = handle.0, "Feed subscriber panicked, event skipped");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionHandle, Callback)>> {
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_publish_and_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let handle = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.publish(&FeedEvent::State(StreamState::Connecting));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(registry.unsubscribe(handle));
        assert!(!registry.unsubscribe(handle));

        registry.publish(&FeedEvent::State(StreamState::Connected));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_callback_can_unsubscribe_itself() {
        let registry = Arc::new(SubscriberRegistry::new());
        let slot: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

        let reg = registry.clone();
        let own = slot.clone();
        let handle = registry.subscribe(move |_| {
            if let Some(h) = *own.lock().unwrap() {
                reg.unsubscribe(h);
            }
        });
        *slot.lock().unwrap() = Some(handle);

        registry.publish(&FeedEvent::State(StreamState::Disconnected));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let registry = SubscriberRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        registry.subscribe(|_| panic!("subscriber bug"));
        let counter = hits.clone();
        registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.publish(&FeedEvent::State(StreamState::Connecting));
        registry.publish(&FeedEvent::State(StreamState::Connected));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }
}
