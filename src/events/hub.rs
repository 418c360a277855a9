//! Single-producer / many-subscriber event hub.
//!
//! # Responsibilities
//! - Register one bounded queue per SSE subscriber
//! - Serialise each event once and enqueue it for every subscriber
//! - Deregister subscribers when their stream is dropped
//!
//! # Design Decisions
//! - Enqueue is `try_send` under the lock: the producer never waits on a
//!   slow subscriber, a full queue drops the newest event for that
//!   subscriber only
//! - Writes to the HTTP response happen outside the lock, in the SSE stream
//! - No replay: a subscriber only sees events broadcast after it joined

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::events::event::DiscoveryEvent;
use crate::observability::metrics;

/// A serialised event, shared between all subscriber queues.
pub type Payload = Arc<str>;

/// Global counter for subscriber IDs.
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        Self(SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Fan-out hub for discovery events.
pub struct EventHub {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Payload>>>,
    capacity: usize,
    closed: AtomicBool,
}

impl EventHub {
    /// Create a hub whose subscribers buffer up to `capacity` pending events.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Payload>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber.
    ///
    /// The returned stream yields an `info: connected` greeting first, then
    /// every payload broadcast from now on, in order. Dropping it deregisters.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = SubscriberId::next();
        let (tx, rx) = mpsc::channel(self.capacity);
        let greeting = encode(&DiscoveryEvent::info("connected"));

        let count = {
            let mut subscribers = self.lock();
            // After close the sender is dropped, so the stream ends after the greeting.
            if !self.closed.load(Ordering::Acquire) {
                subscribers.insert(id, tx);
            }
            subscribers.len()
        };
        metrics::set_sse_subscribers(count);
        tracing::debug!(subscriber = %id, subscribers = count, "SSE subscriber connected");

        Subscription {
            id,
            greeting,
            rx,
            hub: Arc::clone(self),
        }
    }

    /// Fan an event out to every subscriber without blocking.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn broadcast(&self, event: &DiscoveryEvent) -> usize {
        let Some(payload) = encode(event) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dropped = 0;
        let mut closed = Vec::new();

        let mut subscribers = self.lock();
        for (id, tx) in subscribers.iter() {
            match tx.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    tracing::trace!(subscriber = %id, "Subscriber queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in &closed {
            subscribers.remove(id);
        }
        let count = subscribers.len();
        drop(subscribers);

        if dropped > 0 {
            metrics::record_sse_dropped(dropped);
        }
        if !closed.is_empty() {
            metrics::set_sse_subscribers(count);
        }

        tracing::trace!(kind = ?event.kind, delivered, dropped, "Event broadcast");
        delivered
    }

    /// Deregister every subscriber so their streams end, and refuse new ones.
    ///
    /// Used on shutdown: open SSE responses would otherwise keep the server
    /// from draining.
    pub fn close(&self) {
        let removed = {
            let mut subscribers = self.lock();
            self.closed.store(true, Ordering::Release);
            let removed = subscribers.len();
            subscribers.clear();
            removed
        };
        metrics::set_sse_subscribers(0);
        tracing::info!(subscribers = removed, "Event hub closed");
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn unsubscribe(&self, id: SubscriberId) {
        let count = {
            let mut subscribers = self.lock();
            subscribers.remove(&id);
            subscribers.len()
        };
        metrics::set_sse_subscribers(count);
        tracing::debug!(subscriber = %id, subscribers = count, "SSE subscriber disconnected");
    }
}

fn encode(event: &DiscoveryEvent) -> Option<Payload> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Payload::from(json)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize event");
            None
        }
    }
}

/// One subscriber's view of the hub.
pub struct Subscription {
    id: SubscriberId,
    greeting: Option<Payload>,
    rx: mpsc::Receiver<Payload>,
    hub: Arc<EventHub>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Stream for Subscription {
    type Item = Payload;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(greeting) = self.greeting.take() {
            return Poll::Ready(Some(greeting));
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
