//! # Transport session traits
//!
//! The hub never talks to a platform transport directly. It consumes a
//! [`ConnectivitySession`] (activation, reachability/pairing flags, and the
//! three send primitives) and implements [`SessionDelegate`] to receive the
//! session's callbacks.
//!
//! The session holds its delegate weakly so the hub can be dropped while the
//! session lives on; callbacks delivered after that are simply lost.

use std::sync::Weak;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::TransportError;
use crate::message::ConnectivityMessage;
use crate::outcome::ReplyHandler;
use crate::state::{ActivationState, DeviceSide};

/// The platform's peer-to-peer session.
#[async_trait]
pub trait ConnectivitySession: Send + Sync {
    /// Whether this session type is available on the current device.
    fn is_supported(&self) -> bool;

    /// Which side of the pairing this session runs on.
    fn side(&self) -> DeviceSide;

    /// Install the callback receiver. Replaces any previous delegate.
    fn set_delegate(&self, delegate: Weak<dyn SessionDelegate>);

    /// Start activation. Completion is reported through
    /// [`SessionDelegate::activation_did_complete`].
    fn activate(&self) -> Result<(), TransportError>;

    /// Current activation state.
    fn activation_state(&self) -> ActivationState;

    /// Whether the peer is reachable for interactive delivery.
    fn is_reachable(&self) -> bool;

    /// Whether the companion app is installed on the peer.
    fn is_paired_app_installed(&self) -> bool;

    /// Whether a companion is paired. Meaningful on the phone side only.
    fn is_paired(&self) -> bool;

    /// Last application context received from the peer, for late pickup.
    fn received_application_context(&self) -> ConnectivityMessage;

    /// Interactive send. Resolves with the peer's reply.
    async fn send_message(
        &self,
        message: ConnectivityMessage,
    ) -> Result<ConnectivityMessage, TransportError>;

    /// Interactive raw-bytes send.
    async fn send_message_data(&self, data: Bytes) -> Result<(), TransportError>;

    /// Replace the queued application context. Only the latest value is kept.
    fn update_application_context(&self, context: ConnectivityMessage)
    -> Result<(), TransportError>;
}

/// Callback surface of a [`ConnectivitySession`].
///
/// Implementations must return quickly; the session calls these from its own
/// delivery thread.
pub trait SessionDelegate: Send + Sync {
    /// Activation finished with `state`, possibly failing with `error`.
    fn activation_did_complete(&self, state: ActivationState, error: Option<TransportError>);

    /// The session became inactive (companion switch in progress).
    fn session_did_become_inactive(&self);

    /// The session was deactivated.
    fn session_did_deactivate(&self);

    /// Reachability of the peer changed.
    fn reachability_did_change(&self);

    /// Pairing or companion-app install state changed.
    fn companion_state_did_change(&self);

    /// An interactive dictionary message arrived.
    fn did_receive_message(&self, message: ConnectivityMessage, reply: Option<ReplyHandler>);

    /// A queued application context arrived.
    fn did_receive_application_context(
        &self,
        context: ConnectivityMessage,
        error: Option<TransportError>,
    );

    /// An interactive raw-bytes message arrived.
    fn did_receive_message_data(&self, data: Bytes, reply: Option<ReplyHandler>);
}
