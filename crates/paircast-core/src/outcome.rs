//! Receive and send results broadcast to subscribers.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::ConnectivityError;
use crate::message::ConnectivityMessage;

/// Reply callback handed over by the transport with a repliable message.
pub type ReplyCallback = Box<dyn FnOnce(ConnectivityMessage) + Send>;

/// Cloneable, answer-once wrapper around the transport's reply callback.
///
/// Every raw-message subscriber gets a clone; the first one to reply wins and
/// later replies are ignored.
#[derive(Clone)]
pub struct ReplyHandler {
    callback: Arc<Mutex<Option<ReplyCallback>>>,
}

impl ReplyHandler {
    /// Wrap a transport reply callback.
    pub fn new(callback: impl FnOnce(ConnectivityMessage) + Send + 'static) -> Self {
        Self {
            callback: Arc::new(Mutex::new(Some(Box::new(callback)))),
        }
    }

    /// Send the reply. Returns `false` if someone already replied.
    pub fn reply(&self, message: ConnectivityMessage) -> bool {
        let callback = self.callback.lock().take();
        match callback {
            Some(callback) => {
                callback(message);
                true
            }
            None => false,
        }
    }

    /// Whether a reply has already been sent.
    pub fn is_answered(&self) -> bool {
        self.callback.lock().is_none()
    }
}

impl fmt::Debug for ReplyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyHandler")
            .field("answered", &self.is_answered())
            .finish()
    }
}

/// How an incoming raw message arrived.
#[derive(Clone, Debug)]
pub enum ReceiveContext {
    /// Interactive message; carries the reply handler when the sender waits for one.
    Message(Option<ReplyHandler>),
    /// Queued background-context update.
    BackgroundContext,
}

/// An incoming raw message with its delivery context.
#[derive(Clone, Debug)]
pub struct ReceiveResult {
    /// The payload.
    pub message: ConnectivityMessage,
    /// Delivery context.
    pub context: ReceiveContext,
}

/// Transport primitive a send went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Interactive dictionary message.
    Message,
    /// Interactive raw bytes.
    MessageData,
    /// Queued application-context update.
    ApplicationContext,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::MessageData => write!(f, "message_data"),
            Self::ApplicationContext => write!(f, "application_context"),
        }
    }
}

/// Outcome of one send.
#[derive(Clone, Debug, PartialEq)]
pub enum SendOutcome {
    /// Delivered interactively; the peer answered with `reply`.
    RepliedWith {
        /// Reply payload (empty for binary sends).
        reply: ConnectivityMessage,
        /// Primitive used.
        transport: TransportKind,
    },
    /// Queued as the latest background context.
    QueuedAsBackgroundContext {
        /// Primitive used.
        transport: TransportKind,
    },
    /// Delivery failed.
    Failed(ConnectivityError),
}

impl SendOutcome {
    /// Whether the send succeeded.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Transport used, `None` for failures.
    pub fn transport(&self) -> Option<TransportKind> {
        match self {
            Self::RepliedWith { transport, .. } | Self::QueuedAsBackgroundContext { transport } => {
                Some(*transport)
            }
            Self::Failed(_) => None,
        }
    }
}

/// An outgoing message with the outcome of its send.
#[derive(Clone, Debug, PartialEq)]
pub struct SendResult {
    /// The message as sent (binary sends use [`ConnectivityMessage::binary_projection`]).
    pub message: ConnectivityMessage,
    /// What happened.
    pub outcome: SendOutcome,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
