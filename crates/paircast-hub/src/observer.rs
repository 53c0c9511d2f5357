//! # Observer
//!
//! The consumer-facing façade. One [`Observer`] owns the registry, the state
//! manager, the router and the distributor for a single session, and is the
//! session's [`SessionDelegate`].
//!
//! ## Callback handling
//!
//! Delegate callbacks never do work on the transport's thread. Each one is
//! turned into a [`SessionEvent`] and pushed onto an unbounded queue; a single
//! worker task drains the queue and applies events in arrival order. This is
//! why construction needs a Tokio runtime.
//!
//! ## Teardown
//!
//! The session only holds the observer weakly. Dropping the last
//! `Arc<Observer>` stops the worker, which releases every sink set, so all
//! outstanding subscriptions end.

use std::fmt;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span, info, warn};

use paircast_core::codec::{MessageDecoder, OutgoingMessage, SendOptions};
use paircast_core::transport::{ConnectivitySession, SessionDelegate};
use paircast_core::{
    ActivationState, ConnectivityError, ConnectivityMessage, ConnectivityState, ReceiveResult,
    ReplyHandler, SendOutcome, SendResult, SessionFlags, TransportError,
};
use paircast_settings::{HubSettings, SessionSettings};

use crate::distributor::MessageDistributor;
use crate::registry::SubscriptionRegistry;
use crate::router::MessageRouter;
use crate::state::StateManager;
use crate::subscription::Subscription;

/// Lifecycle of the observed session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// `activate()` has not been called.
    Uninitialized,
    /// Waiting for the activation callback.
    Activating,
    /// The session is active.
    Activated,
    /// The session is winding down.
    Inactive,
    /// The session is not active.
    NotActivated,
}

impl From<ActivationState> for LifecyclePhase {
    fn from(state: ActivationState) -> Self {
        match state {
            ActivationState::Activated => Self::Activated,
            ActivationState::Inactive => Self::Inactive,
            ActivationState::NotActivated => Self::NotActivated,
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Inactive => write!(f, "inactive"),
            Self::NotActivated => write!(f, "not_activated"),
        }
    }
}

/// A delegate callback queued for the worker.
enum SessionEvent {
    ActivationCompleted {
        state: ActivationState,
        error: Option<TransportError>,
    },
    BecameInactive,
    Deactivated,
    ReachabilityChanged,
    CompanionStateChanged,
    Message {
        message: ConnectivityMessage,
        reply: Option<ReplyHandler>,
    },
    ApplicationContext {
        context: ConnectivityMessage,
        error: Option<TransportError>,
    },
    MessageData {
        data: Bytes,
        reply: Option<ReplyHandler>,
    },
    Flush(oneshot::Sender<()>),
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::ActivationCompleted { .. } => "activation_completed",
            Self::BecameInactive => "became_inactive",
            Self::Deactivated => "deactivated",
            Self::ReachabilityChanged => "reachability_changed",
            Self::CompanionStateChanged => "companion_state_changed",
            Self::Message { .. } => "message",
            Self::ApplicationContext { .. } => "application_context",
            Self::MessageData { .. } => "message_data",
            Self::Flush(_) => "flush",
        }
    }
}

struct HubInner<M> {
    session: Arc<dyn ConnectivitySession>,
    registry: SubscriptionRegistry<M>,
    state: StateManager,
    router: MessageRouter,
    distributor: MessageDistributor<M>,
    settings: SessionSettings,
    phase: Mutex<LifecyclePhase>,
    last_context: Mutex<Option<ConnectivityMessage>>,
}

impl<M: Clone> HubInner<M> {
    fn activate(&self) -> Result<(), ConnectivityError> {
        if !self.session.is_supported() {
            return Err(ConnectivityError::SessionUnsupported);
        }
        let previous = std::mem::replace(&mut *self.phase.lock(), LifecyclePhase::Activating);
        if let Err(error) = self.session.activate() {
            warn!(%error, "session activation failed to start");
            *self.phase.lock() = previous;
            return Err(error.into());
        }
        debug!(%previous, "activation requested");
        Ok(())
    }

    fn apply(&self, event: SessionEvent) {
        match event {
            SessionEvent::ActivationCompleted { state, error } => {
                self.apply_activation(state, error);
                if self.state.activation_state() == Some(ActivationState::Activated)
                    && self.settings.pickup_pending_context
                {
                    let pending = self.session.received_application_context();
                    if !pending.is_empty() && self.mark_context_seen(&pending) {
                        debug!(keys = pending.len(), "picking up pending application context");
                        self.distributor.handle_application_context(pending, None);
                    }
                }
            }
            SessionEvent::BecameInactive => self.apply_activation(ActivationState::Inactive, None),
            SessionEvent::Deactivated => {
                self.apply_activation(ActivationState::NotActivated, None);
                if self.settings.reactivate_on_deactivate {
                    if let Err(error) = self.activate() {
                        warn!(%error, "reactivation after deactivation failed");
                    }
                }
            }
            SessionEvent::ReachabilityChanged => {
                self.state.update_reachability(self.session.is_reachable());
            }
            SessionEvent::CompanionStateChanged => {
                let flags = SessionFlags::read(self.session.as_ref());
                self.state
                    .update_companion_state(flags.is_paired_app_installed, flags.is_paired);
            }
            SessionEvent::Message { message, reply } => {
                self.distributor.handle_message(message, reply);
            }
            SessionEvent::ApplicationContext { context, error } => {
                if error.is_none() {
                    let _ = self.mark_context_seen(&context);
                }
                self.distributor.handle_application_context(context, error);
            }
            SessionEvent::MessageData { data, reply } => {
                self.distributor.handle_binary_message(data, reply);
            }
            SessionEvent::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    /// Remember `context` as the latest delivered one. Returns `false` when it
    /// was already delivered.
    fn mark_context_seen(&self, context: &ConnectivityMessage) -> bool {
        let mut last = self.last_context.lock();
        if last.as_ref() == Some(context) {
            return false;
        }
        *last = Some(context.clone());
        true
    }

    fn apply_activation(&self, state: ActivationState, error: Option<TransportError>) {
        let flags = SessionFlags::read(self.session.as_ref());
        self.state.handle_activation(flags, state, error);
        if let Some(applied) = self.state.activation_state() {
            let phase = LifecyclePhase::from(applied);
            *self.phase.lock() = phase;
            info!(%phase, "session lifecycle changed");
        }
    }

    fn record(
        &self,
        message: ConnectivityMessage,
        result: Result<SendOutcome, ConnectivityError>,
    ) -> Result<SendResult, ConnectivityError> {
        let outcome = match &result {
            Ok(outcome) => outcome.clone(),
            Err(error) => SendOutcome::Failed(error.clone()),
        };
        let sent = SendResult { message, outcome };
        let delivered = self.registry.messages.send_result.broadcast(&sent);
        match result {
            Ok(_) => {
                debug!(transport = ?sent.outcome.transport(), delivered, "send completed");
                Ok(sent)
            }
            Err(error) => {
                debug!(%error, category = %error.category(), delivered, "send failed");
                Err(error)
            }
        }
    }
}

async fn run_worker<M: Clone>(inner: Arc<HubInner<M>>, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        debug!(event = event.name(), "applying session event");
        inner.apply(event);
    }
    debug!("session event queue closed");
}

/// Public façade over one connectivity session.
///
/// `M` is the typed message produced by the configured decoder.
pub struct Observer<M> {
    inner: Arc<HubInner<M>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    worker: JoinHandle<()>,
}

impl<M> std::fmt::Debug for Observer<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer").finish_non_exhaustive()
    }
}

impl<M> Observer<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Build a hub over `session` and install it as the session's delegate.
    ///
    /// Must be called from within a Tokio runtime. Activation is not started;
    /// call [`Observer::activate`].
    pub fn new(
        session: Arc<dyn ConnectivitySession>,
        decoder: Option<Arc<dyn MessageDecoder<M>>>,
        settings: &HubSettings,
    ) -> Result<Arc<Self>, ConnectivityError> {
        let runtime = Handle::try_current().map_err(|_| ConnectivityError::RuntimeUnavailable)?;
        let side = session.side();
        let span = debug_span!("paircast_hub", ?side);

        let registry = SubscriptionRegistry::new();
        let state = StateManager::new(side, Arc::clone(&registry.state));
        let router = MessageRouter::new(Arc::clone(&session), span.clone());
        let distributor = MessageDistributor::new(
            Arc::clone(&registry.messages),
            decoder,
            settings.decoding.strict,
            span.clone(),
        );
        let inner = Arc::new(HubInner {
            session: Arc::clone(&session),
            registry,
            state,
            router,
            distributor,
            settings: settings.session.clone(),
            phase: Mutex::new(LifecyclePhase::Uninitialized),
            last_context: Mutex::new(None),
        });

        let (events, rx) = mpsc::unbounded_channel();
        let worker = runtime.spawn(run_worker(Arc::clone(&inner), rx).instrument(span));
        let observer = Arc::new(Self {
            inner,
            events,
            worker,
        });

        let delegate: Weak<dyn SessionDelegate> = Arc::downgrade(&observer) as Weak<Self>;
        session.set_delegate(delegate);
        debug!(?side, "hub created");
        Ok(observer)
    }

    // ── lifecycle ───────────────────────────────────────────────────

    /// Start activating the session.
    pub fn activate(&self) -> Result<(), ConnectivityError> {
        self.inner.activate()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        *self.inner.phase.lock()
    }

    /// Wait until every callback delivered before this call has been applied.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.events.send(SessionEvent::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    // ── state ───────────────────────────────────────────────────────

    /// Latest connectivity snapshot.
    pub fn snapshot(&self) -> Arc<ConnectivityState> {
        self.inner.state.snapshot()
    }

    /// Latest activation state; `None` before the first activation callback.
    pub fn activation_state(&self) -> Option<ActivationState> {
        self.inner.state.activation_state()
    }

    /// Error reported with the latest activation event.
    pub fn activation_error(&self) -> Option<TransportError> {
        self.inner.state.activation_error()
    }

    /// Whether the peer is reachable.
    pub fn is_reachable(&self) -> bool {
        self.inner.state.is_reachable()
    }

    /// Whether the companion app is installed.
    pub fn is_paired_app_installed(&self) -> bool {
        self.inner.state.is_paired_app_installed()
    }

    /// Whether a companion is paired.
    pub fn is_paired(&self) -> bool {
        self.inner.state.is_paired()
    }

    // ── subscriptions ───────────────────────────────────────────────

    /// Activation state changes, starting with the current state if known.
    pub fn subscribe_activation_state(&self) -> Subscription<ActivationState> {
        let state = &self.inner.state;
        Subscription::attach(&self.inner.registry.state.activation_state, || {
            state.activation_state()
        })
    }

    /// Activation outcomes, starting with the current one if known.
    pub fn subscribe_activation_result(&self) -> Subscription<Result<ActivationState, TransportError>> {
        let state = &self.inner.state;
        Subscription::attach(&self.inner.registry.state.activation_result, || {
            state.snapshot().activation_result()
        })
    }

    /// Reachability changes, starting with the current value.
    pub fn subscribe_reachability(&self) -> Subscription<bool> {
        let state = &self.inner.state;
        Subscription::attach(&self.inner.registry.state.reachability, || {
            Some(state.is_reachable())
        })
    }

    /// Companion-app install changes, starting with the current value.
    pub fn subscribe_companion_install(&self) -> Subscription<bool> {
        let state = &self.inner.state;
        Subscription::attach(&self.inner.registry.state.companion_install, || {
            Some(state.is_paired_app_installed())
        })
    }

    /// Paired-flag changes, starting with the current value. On the wearable
    /// side only the replayed value arrives.
    pub fn subscribe_paired(&self) -> Subscription<bool> {
        let state = &self.inner.state;
        Subscription::attach(&self.inner.registry.state.paired, || Some(state.is_paired()))
    }

    /// Incoming messages and background contexts from now on.
    pub fn subscribe_messages(&self) -> Subscription<ReceiveResult> {
        Subscription::attach(&self.inner.registry.messages.raw_message, || None)
    }

    /// Decoded incoming messages from now on.
    pub fn subscribe_typed_messages(&self) -> Subscription<M> {
        Subscription::attach(&self.inner.registry.messages.typed_message, || None)
    }

    /// Outcomes of sends issued from now on.
    pub fn subscribe_send_results(&self) -> Subscription<SendResult> {
        Subscription::attach(&self.inner.registry.messages.send_result, || None)
    }

    /// Registered subscriptions per stream kind.
    pub fn registry(&self) -> &SubscriptionRegistry<M> {
        &self.inner.registry
    }

    // ── sending ─────────────────────────────────────────────────────

    /// Send a dictionary message through the best available transport.
    ///
    /// The outcome, success or failure, is also broadcast to send-result
    /// subscribers.
    pub async fn send(&self, message: ConnectivityMessage) -> Result<SendResult, ConnectivityError> {
        let result = self.inner.router.send(&message).await;
        self.inner.record(message, result)
    }

    /// Send raw bytes. Requires the peer to be reachable.
    pub async fn send_binary(&self, data: Bytes) -> Result<SendResult, ConnectivityError> {
        let projection = ConnectivityMessage::binary_projection(data.clone());
        let result = self.inner.router.send_binary(data).await;
        self.inner.record(projection, result)
    }

    /// Encode and send a typed message. Binary-capable messages go through
    /// [`Observer::send_binary`] unless `options` force the dictionary path.
    ///
    /// Encoding failures are returned without reaching the transport or the
    /// send-result stream.
    pub async fn send_typed(
        &self,
        message: &dyn OutgoingMessage,
        options: SendOptions,
    ) -> Result<SendResult, ConnectivityError> {
        if !options.force_dictionary {
            if let Some(encoded) = message.encode_binary() {
                return self.send_binary(encoded?).await;
            }
        }
        let encoded = message.encode()?;
        self.send(encoded).await
    }

    fn enqueue(&self, event: SessionEvent) {
        if let Err(mpsc::error::SendError(event)) = self.events.send(event) {
            debug!(event = event.name(), "hub worker stopped, dropping session event");
        }
    }
}

impl<M> SessionDelegate for Observer<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn activation_did_complete(&self, state: ActivationState, error: Option<TransportError>) {
        self.enqueue(SessionEvent::ActivationCompleted { state, error });
    }

    fn session_did_become_inactive(&self) {
        self.enqueue(SessionEvent::BecameInactive);
    }

    fn session_did_deactivate(&self) {
        self.enqueue(SessionEvent::Deactivated);
    }

    fn reachability_did_change(&self) {
        self.enqueue(SessionEvent::ReachabilityChanged);
    }

    fn companion_state_did_change(&self) {
        self.enqueue(SessionEvent::CompanionStateChanged);
    }

    fn did_receive_message(&self, message: ConnectivityMessage, reply: Option<ReplyHandler>) {
        self.enqueue(SessionEvent::Message { message, reply });
    }

    fn did_receive_application_context(
        &self,
        context: ConnectivityMessage,
        error: Option<TransportError>,
    ) {
        self.enqueue(SessionEvent::ApplicationContext { context, error });
    }

    fn did_receive_message_data(&self, data: Bytes, reply: Option<ReplyHandler>) {
        self.enqueue(SessionEvent::MessageData { data, reply });
    }
}

impl<M> Drop for Observer<M> {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSession;
    use assert_matches::assert_matches;
    use paircast_core::TransportKind;
    use paircast_core::codec::JsonMessageDecoder;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Deserialize)]
    struct Ping {
        seq: i64,
    }

    fn hub(session: &Arc<FakeSession>) -> Arc<Observer<Ping>> {
        hub_with(session, &HubSettings::default())
    }

    fn hub_with(session: &Arc<FakeSession>, settings: &HubSettings) -> Arc<Observer<Ping>> {
        let decoder = Arc::new(JsonMessageDecoder::<Ping>::new()) as Arc<dyn MessageDecoder<Ping>>;
        Observer::new(Arc::clone(session) as Arc<dyn ConnectivitySession>, Some(decoder), settings)
            .unwrap()
    }

    fn flags(r: bool, i: bool, p: bool) -> SessionFlags {
        SessionFlags {
            is_reachable: r,
            is_paired_app_installed: i,
            is_paired: p,
        }
    }

    #[test]
    fn construction_requires_a_runtime() {
        let session = Arc::new(FakeSession::new()) as Arc<dyn ConnectivitySession>;
        let result = Observer::<Ping>::new(session, None, &HubSettings::default());
        assert_matches!(result, Err(ConnectivityError::RuntimeUnavailable));
    }

    #[tokio::test]
    async fn installs_itself_as_delegate() {
        let session = Arc::new(FakeSession::new());
        let observer = hub(&session);
        assert!(session.has_delegate());
        drop(observer);
        assert!(!session.has_delegate());
    }

    #[tokio::test]
    async fn unsupported_session_cannot_activate() {
        let session = Arc::new(FakeSession::unsupported());
        let observer = hub(&session);
        assert_eq!(observer.activate(), Err(ConnectivityError::SessionUnsupported));
        assert_eq!(observer.phase(), LifecyclePhase::Uninitialized);
        assert_eq!(session.activate_calls(), 0);
    }

    #[tokio::test]
    async fn activation_failure_restores_phase() {
        let session = Arc::new(FakeSession::new());
        let failure = TransportError::new("fake", 1, "busy");
        session.fail_activation_with(failure.clone());
        let observer = hub(&session);

        assert_eq!(observer.activate(), Err(ConnectivityError::Transport(failure)));
        assert_eq!(observer.phase(), LifecyclePhase::Uninitialized);
    }

    #[tokio::test]
    async fn lifecycle_follows_callbacks() {
        let session = Arc::new(FakeSession::new());
        let settings = HubSettings {
            session: SessionSettings {
                reactivate_on_deactivate: false,
                ..SessionSettings::default()
            },
            ..HubSettings::default()
        };
        let observer = hub_with(&session, &settings);
        assert_eq!(observer.phase(), LifecyclePhase::Uninitialized);

        observer.activate().unwrap();
        assert_eq!(observer.phase(), LifecyclePhase::Activating);

        session.set_flags(flags(true, true, true));
        session.complete_activation(ActivationState::Activated, None);
        observer.flush().await;
        assert_eq!(observer.phase(), LifecyclePhase::Activated);
        assert!(observer.is_reachable());

        session.become_inactive();
        observer.flush().await;
        assert_eq!(observer.phase(), LifecyclePhase::Inactive);

        session.deactivate();
        observer.flush().await;
        assert_eq!(observer.phase(), LifecyclePhase::NotActivated);
        assert_eq!(session.activate_calls(), 1);
    }

    #[tokio::test]
    async fn deactivation_reactivates_by_default() {
        let session = Arc::new(FakeSession::new());
        let observer = hub(&session);
        observer.activate().unwrap();
        session.complete_activation(ActivationState::Activated, None);
        session.deactivate();
        observer.flush().await;

        assert_eq!(session.activate_calls(), 2);
        assert_eq!(observer.phase(), LifecyclePhase::Activating);
    }

    #[tokio::test]
    async fn activation_error_wins_over_activated() {
        let session = Arc::new(FakeSession::new());
        let observer = hub(&session);
        let mut results = observer.subscribe_activation_result();
        let failure = TransportError::new("fake", 9, "denied");

        session.complete_activation(ActivationState::Activated, Some(failure.clone()));
        observer.flush().await;

        assert_eq!(observer.phase(), LifecyclePhase::NotActivated);
        assert_eq!(observer.activation_error(), Some(failure.clone()));
        assert_eq!(results.recv().await, Some(Err(failure)));
    }

    #[tokio::test]
    async fn state_subscriptions_replay_current_value() {
        let session = Arc::new(FakeSession::new());
        let observer = hub(&session);
        session.set_flags(flags(true, false, true));
        session.complete_activation(ActivationState::Activated, None);
        observer.flush().await;

        let mut activation = observer.subscribe_activation_state();
        let mut reach = observer.subscribe_reachability();
        let mut paired = observer.subscribe_paired();

        assert_eq!(activation.try_recv(), Some(ActivationState::Activated));
        assert_eq!(reach.try_recv(), Some(true));
        assert_eq!(paired.try_recv(), Some(true));
    }

    #[tokio::test]
    async fn activation_subscription_is_empty_before_first_callback() {
        let session = Arc::new(FakeSession::new());
        let observer = hub(&session);
        let mut activation = observer.subscribe_activation_state();
        let mut install = observer.subscribe_companion_install();

        assert_eq!(activation.try_recv(), None);
        assert_eq!(install.try_recv(), Some(false));
    }

    #[tokio::test]
    async fn message_subscriptions_do_not_replay() {
        let session = Arc::new(FakeSession::new());
        let observer = hub(&session);
        session.deliver_message(ConnectivityMessage::new().with("seq", 1_i64), None);
        observer.flush().await;

        let mut raw = observer.subscribe_messages();
        let mut typed = observer.subscribe_typed_messages();
        assert!(raw.try_recv().is_none());
        assert_eq!(typed.try_recv(), None);

        session.deliver_message(ConnectivityMessage::new().with("seq", 2_i64), None);
        observer.flush().await;
        assert!(raw.try_recv().is_some());
        assert_eq!(typed.try_recv(), Some(Ping { seq: 2 }));
    }

    #[tokio::test]
    async fn pending_context_is_picked_up_after_activation() {
        let session = Arc::new(FakeSession::new());
        session.set_received_application_context(ConnectivityMessage::new().with("seq", 5_i64));
        let observer = hub(&session);
        let mut typed = observer.subscribe_typed_messages();

        session.complete_activation(ActivationState::Activated, None);
        observer.flush().await;

        assert_eq!(typed.try_recv(), Some(Ping { seq: 5 }));
    }

    #[tokio::test]
    async fn pending_context_is_not_redelivered_on_reactivation() {
        let session = Arc::new(FakeSession::new());
        session.set_received_application_context(ConnectivityMessage::new().with("seq", 5_i64));
        let observer = hub(&session);
        let mut typed = observer.subscribe_typed_messages();

        observer.activate().unwrap();
        session.complete_activation(ActivationState::Activated, None);
        observer.flush().await;
        assert_eq!(typed.try_recv(), Some(Ping { seq: 5 }));

        session.deactivate();
        session.complete_activation(ActivationState::Activated, None);
        observer.flush().await;
        assert_eq!(session.activate_calls(), 2);
        assert_eq!(typed.try_recv(), None);

        session.set_received_application_context(ConnectivityMessage::new().with("seq", 6_i64));
        session.deactivate();
        session.complete_activation(ActivationState::Activated, None);
        observer.flush().await;
        assert_eq!(typed.try_recv(), Some(Ping { seq: 6 }));
    }

    #[tokio::test]
    async fn delivered_context_is_not_picked_up_again() {
        let session = Arc::new(FakeSession::new());
        let observer = hub(&session);
        let mut typed = observer.subscribe_typed_messages();
        let context = ConnectivityMessage::new().with("seq", 7_i64);

        session.complete_activation(ActivationState::Activated, None);
        session.deliver_application_context(context.clone(), None);
        session.set_received_application_context(context);
        session.deactivate();
        session.complete_activation(ActivationState::Activated, None);
        observer.flush().await;

        assert_eq!(typed.try_recv(), Some(Ping { seq: 7 }));
        assert_eq!(typed.try_recv(), None);
    }

    #[tokio::test]
    async fn queued_then_replied() {
        let session = Arc::new(FakeSession::new());
        session.set_flags(flags(false, true, true));
        let observer = hub(&session);
        let mut results = observer.subscribe_send_results();

        let first = observer
            .send(ConnectivityMessage::new().with("k", "v"))
            .await
            .unwrap();
        assert_matches!(first.outcome, SendOutcome::QueuedAsBackgroundContext { .. });

        session.change_reachability(true);
        observer.flush().await;
        let second = observer
            .send(ConnectivityMessage::new().with("k", "v2"))
            .await
            .unwrap();
        assert_matches!(
            second.outcome,
            SendOutcome::RepliedWith { transport: TransportKind::Message, .. }
        );

        assert_eq!(results.recv().await, Some(first));
        assert_eq!(results.recv().await, Some(second));
    }

    #[tokio::test]
    async fn failed_send_is_returned_and_broadcast_once() {
        let session = Arc::new(FakeSession::new());
        session.set_flags(flags(false, false, true));
        let observer = hub(&session);
        let mut results = observer.subscribe_send_results();

        let err = observer.send(ConnectivityMessage::new()).await.unwrap_err();
        assert_eq!(err, ConnectivityError::CompanionAppNotInstalled);

        let broadcast = results.try_recv().unwrap();
        assert_eq!(
            broadcast.outcome,
            SendOutcome::Failed(ConnectivityError::CompanionAppNotInstalled)
        );
        assert!(results.try_recv().is_none());
    }
}
