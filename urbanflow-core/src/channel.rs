//! Publish/subscribe channels.
//!
//! Two flavours are used by the runtime:
//!
//! - [`Replay`]: caches the most recent value and hands it to every new
//!   subscriber before any later value. Used for traffic snapshots.
//! - [`Broadcast`]: plain fan-out with no replay. A value published while
//!   nobody is subscribed is lost. Used for alerts.
//!
//! Both are backed by a `tokio::sync::broadcast` channel, so a subscriber
//! that falls too far behind skips forward to newer values rather than
//! seeing them out of order.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::warn;

/// Default number of values buffered per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Latest-value holder plus subscriber list.
///
/// Cloning a `Replay` yields another handle to the same channel.
#[derive(Debug)]
pub struct Replay<T> {
    inner: Arc<ReplayInner<T>>,
}

#[derive(Debug)]
struct ReplayInner<T> {
    latest: Mutex<Option<T>>,
    tx: broadcast::Sender<T>,
}

impl<T> Clone for Replay<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Replay<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(ReplayInner {
                latest: Mutex::new(None),
                tx,
            }),
        }
    }

    /// Replace the cached value and deliver it to current subscribers.
    ///
    /// Returns the number of subscribers that were sent the value.
    pub fn publish(&self, value: T) -> usize {
        let mut latest = self.inner.latest.lock();
        *latest = Some(value.clone());
        // Sent while holding the cache lock so a concurrent subscribe sees
        // either the old cache plus this value, or this value as its cache.
        self.inner.tx.send(value).unwrap_or(0)
    }

    /// The most recently published value.
    pub fn latest(&self) -> Option<T> {
        self.inner.latest.lock().clone()
    }

    /// Subscribe, receiving the cached value first (if any).
    pub fn subscribe(&self) -> Subscription<T> {
        let latest = self.inner.latest.lock();
        Subscription {
            pending: latest.clone(),
            rx: self.inner.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for Replay<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Fan-out channel without replay.
#[derive(Debug)]
pub struct Broadcast<T> {
    tx: broadcast::Sender<T>,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Broadcast<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver a value to current subscribers. Returns how many received it;
    /// zero means the value was dropped.
    pub fn publish(&self, value: T) -> usize {
        self.tx.send(value).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            pending: None,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Receiving end of a [`Replay`] or [`Broadcast`] channel.
#[derive(Debug)]
pub struct Subscription<T> {
    pending: Option<T>,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next value.
    ///
    /// Returns `None` once every publisher handle has been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged, skipping to newer values");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next value if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged, skipping to newer values");
                }
                Err(_) => return None,
            }
        }
    }
}
