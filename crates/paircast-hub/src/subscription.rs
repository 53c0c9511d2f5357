//! Consumer-facing subscription streams.

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use paircast_core::ids::SubscriptionId;

use crate::registry::SinkSet;

/// An independently cancellable stream of one kind's broadcasts.
///
/// Dropping the subscription unregisters it. The stream ends (`None`) once
/// the hub that owns the sink set is torn down.
pub struct Subscription<T> {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<T>,
    sinks: Weak<SinkSet<T>>,
}

impl<T: Clone> Subscription<T> {
    /// Register a fresh subscription on `sinks`, replaying `current()` first
    /// when the set's kind replays its current value.
    pub fn attach(sinks: &Arc<SinkSet<T>>, current: impl FnOnce() -> Option<T>) -> Self {
        let id = SubscriptionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        if sinks.kind().replays_current_value() {
            sinks.register_with(id.clone(), tx, current);
        } else {
            sinks.register(id.clone(), tx);
        }
        Self {
            id,
            rx,
            sinks: Arc::downgrade(sinks),
        }
    }
}

impl<T> Subscription<T> {
    /// Identifier of this subscription.
    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Wait for the next value. `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take an already-delivered value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving. Equivalent to dropping the subscription.
    pub fn cancel(self) {}
}

impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(sinks) = self.sinks.upgrade() {
            sinks.unregister(&self.id);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
