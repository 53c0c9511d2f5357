//! In-memory collaborators for tests and host-side simulations.
//!
//! [`FakeSession`] records what the hub sends and lets a test drive every
//! delegate callback by hand. [`FakePathMonitor`] does the same for network
//! path updates.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use paircast_core::transport::{ConnectivitySession, SessionDelegate};
use paircast_core::{
    ActivationState, ConnectivityMessage, DeviceSide, ReplyHandler, SessionFlags, TransportError,
};

use crate::network::{PathHandler, PathMonitor, PathStatus};

struct FakeState {
    side: DeviceSide,
    supported: bool,
    flags: SessionFlags,
    activation_state: ActivationState,
    activate_calls: usize,
    activate_failure: Option<TransportError>,
    reply: ConnectivityMessage,
    send_failure: Option<TransportError>,
    sent_messages: Vec<ConnectivityMessage>,
    sent_data: Vec<Bytes>,
    application_context: Option<ConnectivityMessage>,
    received_context: ConnectivityMessage,
}

/// Scriptable [`ConnectivitySession`].
pub struct FakeSession {
    state: Mutex<FakeState>,
    delegate: Mutex<Option<Weak<dyn SessionDelegate>>>,
}

impl FakeSession {
    /// A supported phone-side session with every flag `false`.
    pub fn new() -> Self {
        Self::on_side(DeviceSide::Phone)
    }

    /// A supported session on `side` with every flag `false`.
    pub fn on_side(side: DeviceSide) -> Self {
        Self {
            state: Mutex::new(FakeState {
                side,
                supported: true,
                flags: SessionFlags::default(),
                activation_state: ActivationState::NotActivated,
                activate_calls: 0,
                activate_failure: None,
                reply: ConnectivityMessage::new(),
                send_failure: None,
                sent_messages: Vec::new(),
                sent_data: Vec::new(),
                application_context: None,
                received_context: ConnectivityMessage::new(),
            }),
            delegate: Mutex::new(None),
        }
    }

    /// A session whose type is not available on the device.
    pub fn unsupported() -> Self {
        let session = Self::new();
        session.state.lock().supported = false;
        session
    }

    // ── configuration ───────────────────────────────────────────────

    /// Set reachability, install and paired flags without notifying.
    pub fn set_flags(&self, flags: SessionFlags) {
        self.state.lock().flags = flags;
    }

    /// Reply the peer gives to every interactive message.
    pub fn set_reply(&self, reply: ConnectivityMessage) {
        self.state.lock().reply = reply;
    }

    /// Make every send primitive fail with `error`.
    pub fn fail_sends_with(&self, error: TransportError) {
        self.state.lock().send_failure = Some(error);
    }

    /// Make `activate()` fail synchronously with `error`.
    pub fn fail_activation_with(&self, error: TransportError) {
        self.state.lock().activate_failure = Some(error);
    }

    /// Context returned by `received_application_context()`.
    pub fn set_received_application_context(&self, context: ConnectivityMessage) {
        self.state.lock().received_context = context;
    }

    // ── inspection ──────────────────────────────────────────────────

    /// Messages sent interactively, in order.
    pub fn sent_messages(&self) -> Vec<ConnectivityMessage> {
        self.state.lock().sent_messages.clone()
    }

    /// Raw bytes sent interactively, in order.
    pub fn sent_data(&self) -> Vec<Bytes> {
        self.state.lock().sent_data.clone()
    }

    /// Latest queued application context.
    pub fn application_context(&self) -> Option<ConnectivityMessage> {
        self.state.lock().application_context.clone()
    }

    /// How many times `activate()` was called.
    pub fn activate_calls(&self) -> usize {
        self.state.lock().activate_calls
    }

    /// Whether a live delegate is installed.
    pub fn has_delegate(&self) -> bool {
        self.delegate().is_some()
    }

    // ── callback drivers ────────────────────────────────────────────

    /// Finish activation with `state` and `error`.
    pub fn complete_activation(&self, state: ActivationState, error: Option<TransportError>) {
        self.state.lock().activation_state = state;
        self.notify(|d| d.activation_did_complete(state, error));
    }

    /// Report the session as inactive.
    pub fn become_inactive(&self) {
        self.state.lock().activation_state = ActivationState::Inactive;
        self.notify(|d| d.session_did_become_inactive());
    }

    /// Report the session as deactivated.
    pub fn deactivate(&self) {
        self.state.lock().activation_state = ActivationState::NotActivated;
        self.notify(|d| d.session_did_deactivate());
    }

    /// Change reachability and notify.
    pub fn change_reachability(&self, is_reachable: bool) {
        self.state.lock().flags.is_reachable = is_reachable;
        self.notify(|d| d.reachability_did_change());
    }

    /// Change install and paired flags and notify.
    pub fn change_companion_state(&self, is_paired_app_installed: bool, is_paired: bool) {
        {
            let mut state = self.state.lock();
            state.flags.is_paired_app_installed = is_paired_app_installed;
            state.flags.is_paired = is_paired;
        }
        self.notify(|d| d.companion_state_did_change());
    }

    /// Deliver an interactive message from the peer.
    pub fn deliver_message(&self, message: ConnectivityMessage, reply: Option<ReplyHandler>) {
        self.notify(|d| d.did_receive_message(message, reply));
    }

    /// Deliver an application context from the peer.
    pub fn deliver_application_context(
        &self,
        context: ConnectivityMessage,
        error: Option<TransportError>,
    ) {
        self.notify(|d| d.did_receive_application_context(context, error));
    }

    /// Deliver raw bytes from the peer.
    pub fn deliver_message_data(&self, data: Bytes, reply: Option<ReplyHandler>) {
        self.notify(|d| d.did_receive_message_data(data, reply));
    }

    fn delegate(&self) -> Option<Arc<dyn SessionDelegate>> {
        self.delegate.lock().as_ref().and_then(Weak::upgrade)
    }

    fn notify(&self, deliver: impl FnOnce(&dyn SessionDelegate)) {
        if let Some(delegate) = self.delegate() {
            deliver(delegate.as_ref());
        }
    }
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectivitySession for FakeSession {
    fn is_supported(&self) -> bool {
        self.state.lock().supported
    }

    fn side(&self) -> DeviceSide {
        self.state.lock().side
    }

    fn set_delegate(&self, delegate: Weak<dyn SessionDelegate>) {
        *self.delegate.lock() = Some(delegate);
    }

    fn activate(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.activate_calls += 1;
        match state.activate_failure.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn activation_state(&self) -> ActivationState {
        self.state.lock().activation_state
    }

    fn is_reachable(&self) -> bool {
        self.state.lock().flags.is_reachable
    }

    fn is_paired_app_installed(&self) -> bool {
        self.state.lock().flags.is_paired_app_installed
    }

    fn is_paired(&self) -> bool {
        self.state.lock().flags.is_paired
    }

    fn received_application_context(&self) -> ConnectivityMessage {
        self.state.lock().received_context.clone()
    }

    async fn send_message(
        &self,
        message: ConnectivityMessage,
    ) -> Result<ConnectivityMessage, TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.send_failure.clone() {
            return Err(error);
        }
        state.sent_messages.push(message);
        Ok(state.reply.clone())
    }

    async fn send_message_data(&self, data: Bytes) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.send_failure.clone() {
            return Err(error);
        }
        state.sent_data.push(data);
        Ok(())
    }

    fn update_application_context(
        &self,
        context: ConnectivityMessage,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.send_failure.clone() {
            return Err(error);
        }
        state.application_context = Some(context);
        Ok(())
    }
}

/// Scriptable [`PathMonitor`].
#[derive(Default)]
pub struct FakePathMonitor {
    handler: Mutex<Option<Arc<PathHandler>>>,
    started: AtomicBool,
    cancelled: AtomicBool,
}

impl FakePathMonitor {
    /// A monitor that has not been started.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `status` to the started handler. Ignored once cancelled.
    /// The handler runs on the calling thread, outside the monitor's lock.
    pub fn emit(&self, status: PathStatus) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            (*handler)(status);
        }
    }

    /// Whether `start` was called.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether `cancel` was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl PathMonitor for FakePathMonitor {
    fn start(&self, handler: PathHandler) {
        *self.handler.lock() = Some(Arc::new(handler));
        self.started.store(true, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = self.handler.lock().take();
    }
}
