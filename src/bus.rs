//! Named broadcast topics carrying snapshots out of the control thread.
//!
//! The control thread must never wait on a listener, so publishing is
//! fire-and-forget and a slow subscriber loses the oldest messages instead.
//! Each [`Subscription`] reports such overruns under its topic's name.

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Topic<T> {
    name: &'static str,
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    /// A topic keeping at most `capacity` unread messages per subscriber.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { name, tx }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Publish without blocking. Returns how many subscribers will see the
    /// message; it is dropped while nobody listens.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription<T> {
        debug!(topic = self.name, "subscribed");
        Subscription {
            topic: self.name,
            rx: self.tx.subscribe(),
            skipped: 0,
        }
    }
}

/// Receiving end of a [`Topic`].
#[derive(Debug)]
pub struct Subscription<T> {
    topic: &'static str,
    rx: broadcast::Receiver<Arc<T>>,
    skipped: u64,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    /// Wait for the next message. Overruns are logged and skipped; `None`
    /// means every publisher is gone.
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(RecvError::Lagged(n)) => self.lagged(n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The newest queued message, discarding older ones, without waiting.
    pub fn latest(&mut self) -> Option<Arc<T>> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if latest.is_some() {
                        self.skipped += 1;
                    }
                    latest = Some(msg);
                }
                Err(TryRecvError::Lagged(n)) => self.lagged(n),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return latest,
            }
        }
    }

    /// Messages lost or passed over so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn lagged(&mut self, n: u64) {
        self.skipped += n;
        warn!(topic = self.topic, skipped = n, "subscriber lagged");
    }
}
