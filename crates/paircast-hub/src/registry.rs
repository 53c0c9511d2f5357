//! Subscription registry: one sink set per stream kind.
//!
//! Each [`SinkSet`] is its own mutual-exclusion domain. Broadcasting sends on
//! unbounded channels while holding the set's lock, which gives three
//! properties at once:
//!
//! - every sink of a kind sees broadcasts in the same order,
//! - a sink removed by [`SinkSet::unregister`] receives nothing once the call
//!   returns,
//! - the lock is never held across an await point.
//!
//! Duplicate registration and unregistering an unknown id are programmer
//! errors: they panic in debug builds and are logged and ignored in release.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{error, trace};

use paircast_core::ids::SubscriptionId;
use paircast_core::{ActivationState, ReceiveResult, SendResult, TransportError};

/// Write half of a subscription.
pub type Sink<T> = mpsc::UnboundedSender<T>;

/// Independent broadcast channels of the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Activation state changes.
    ActivationState,
    /// Combined activation success/failure.
    ActivationResult,
    /// Peer reachability.
    Reachability,
    /// Companion-app install flag.
    CompanionInstall,
    /// Paired flag (phone side).
    Paired,
    /// Raw incoming messages and background contexts.
    RawMessage,
    /// Decoded incoming messages.
    TypedMessage,
    /// Outcomes of sends.
    SendResult,
    /// Network path availability.
    NetworkPath,
}

impl StreamKind {
    /// Whether a new subscriber first receives the current value.
    ///
    /// State kinds replay; message and send-result kinds only deliver what is
    /// broadcast after subscription.
    pub const fn replays_current_value(self) -> bool {
        match self {
            Self::ActivationState
            | Self::ActivationResult
            | Self::Reachability
            | Self::CompanionInstall
            | Self::Paired
            | Self::NetworkPath => true,
            Self::RawMessage | Self::TypedMessage | Self::SendResult => false,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ActivationState => "activation_state",
            Self::ActivationResult => "activation_result",
            Self::Reachability => "reachability",
            Self::CompanionInstall => "companion_install",
            Self::Paired => "paired",
            Self::RawMessage => "raw_message",
            Self::TypedMessage => "typed_message",
            Self::SendResult => "send_result",
            Self::NetworkPath => "network_path",
        };
        f.write_str(name)
    }
}

/// Registered sinks of one stream kind, in registration order.
pub struct SinkSet<T> {
    kind: StreamKind,
    sinks: Mutex<Vec<(SubscriptionId, Sink<T>)>>,
}

impl<T> SinkSet<T> {
    /// Create an empty set for `kind`.
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            sinks: Mutex::new(Vec::new()),
        }
    }

    /// Stream kind this set serves.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Whether no sink is registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.lock().is_empty()
    }

    /// Remove the sink registered under `id`.
    pub fn unregister(&self, id: &SubscriptionId) {
        let mut sinks = self.sinks.lock();
        if let Some(index) = sinks.iter().position(|(existing, _)| existing == id) {
            let _ = sinks.remove(index);
            trace!(kind = %self.kind, subscription = %id, "unregistered");
        } else {
            drop(sinks);
            programmer_error(self.kind, id, "unregistering unknown");
        }
    }
}

impl<T: Clone> SinkSet<T> {
    /// Register `sink` under `id`.
    pub fn register(&self, id: SubscriptionId, sink: Sink<T>) {
        self.register_with(id, sink, || None);
    }

    /// Register `sink` under `id`, first enqueuing the value `initial`
    /// produces. `initial` runs under the set's lock, so no broadcast can be
    /// interleaved between the replayed value and the registration.
    pub fn register_with(&self, id: SubscriptionId, sink: Sink<T>, initial: impl FnOnce() -> Option<T>) {
        let mut sinks = self.sinks.lock();
        if sinks.iter().any(|(existing, _)| existing == &id) {
            drop(sinks);
            programmer_error(self.kind, &id, "duplicate");
            return;
        }
        if let Some(value) = initial() {
            let _ = sink.send(value);
        }
        trace!(kind = %self.kind, subscription = %id, "registered");
        sinks.push((id, sink));
    }

    /// Deliver `value` to every registered sink. Returns how many accepted it;
    /// sinks whose reader is gone are skipped.
    pub fn broadcast(&self, value: &T) -> usize {
        let sinks = self.sinks.lock();
        let mut delivered = 0;
        for (id, sink) in sinks.iter() {
            if sink.send(value.clone()).is_ok() {
                delivered += 1;
            } else {
                trace!(kind = %self.kind, subscription = %id, "sink closed, skipping");
            }
        }
        delivered
    }
}

fn programmer_error(kind: StreamKind, id: &SubscriptionId, what: &str) {
    if cfg!(debug_assertions) {
        panic!("{what} subscription {id} for stream {kind}");
    }
    error!(kind = %kind, subscription = %id, "{what} subscription ignored");
}

/// Sink sets for the snapshot-derived stream kinds.
pub struct StateStreams {
    /// Activation state changes.
    pub activation_state: Arc<SinkSet<ActivationState>>,
    /// Combined activation success/failure.
    pub activation_result: Arc<SinkSet<Result<ActivationState, TransportError>>>,
    /// Peer reachability.
    pub reachability: Arc<SinkSet<bool>>,
    /// Companion-app install flag.
    pub companion_install: Arc<SinkSet<bool>>,
    /// Paired flag.
    pub paired: Arc<SinkSet<bool>>,
}

impl StateStreams {
    fn new() -> Self {
        Self {
            activation_state: Arc::new(SinkSet::new(StreamKind::ActivationState)),
            activation_result: Arc::new(SinkSet::new(StreamKind::ActivationResult)),
            reachability: Arc::new(SinkSet::new(StreamKind::Reachability)),
            companion_install: Arc::new(SinkSet::new(StreamKind::CompanionInstall)),
            paired: Arc::new(SinkSet::new(StreamKind::Paired)),
        }
    }
}

/// Sink sets for incoming messages and send outcomes.
pub struct MessageStreams<M> {
    /// Raw incoming messages and background contexts.
    pub raw_message: Arc<SinkSet<ReceiveResult>>,
    /// Decoded incoming messages.
    pub typed_message: Arc<SinkSet<M>>,
    /// Outcomes of sends.
    pub send_result: Arc<SinkSet<SendResult>>,
}

impl<M> MessageStreams<M> {
    fn new() -> Self {
        Self {
            raw_message: Arc::new(SinkSet::new(StreamKind::RawMessage)),
            typed_message: Arc::new(SinkSet::new(StreamKind::TypedMessage)),
            send_result: Arc::new(SinkSet::new(StreamKind::SendResult)),
        }
    }
}

/// All stream kinds of one hub.
pub struct SubscriptionRegistry<M> {
    /// Snapshot-derived kinds, written by the state manager.
    pub state: Arc<StateStreams>,
    /// Message and send-result kinds, written by the distributor and observer.
    pub messages: Arc<MessageStreams<M>>,
}

impl<M> SubscriptionRegistry<M> {
    /// Create a registry with no subscriptions.
    pub fn new() -> Self {
        Self {
            state: Arc::new(StateStreams::new()),
            messages: Arc::new(MessageStreams::new()),
        }
    }

    /// Number of sinks registered for `kind`. Network-path sinks belong to
    /// the network observer and are not counted here.
    pub fn count(&self, kind: StreamKind) -> usize {
        match kind {
            StreamKind::ActivationState => self.state.activation_state.len(),
            StreamKind::ActivationResult => self.state.activation_result.len(),
            StreamKind::Reachability => self.state.reachability.len(),
            StreamKind::CompanionInstall => self.state.companion_install.len(),
            StreamKind::Paired => self.state.paired.len(),
            StreamKind::RawMessage => self.messages.raw_message.len(),
            StreamKind::TypedMessage => self.messages.typed_message.len(),
            StreamKind::SendResult => self.messages.send_result.len(),
            StreamKind::NetworkPath => 0,
        }
    }
}

impl<M> Default for SubscriptionRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
