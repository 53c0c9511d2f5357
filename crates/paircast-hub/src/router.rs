//! Message router: picks a delivery strategy from the session's flags.
//!
//! The policy lives in [`select_route`], a pure function over
//! [`SessionFlags`]. [`MessageRouter`] reads the flags from the session at send
//! time, applies the policy, and drives the matching transport primitive.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{Instrument, Span, debug};

use paircast_core::transport::ConnectivitySession;
use paircast_core::{ConnectivityError, ConnectivityMessage, SendOutcome, SessionFlags, TransportKind};

/// Delivery strategy for a dictionary message.
#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    /// Interactive send with a reply.
    Interactive,
    /// Replace the queued application context.
    BackgroundContext,
    /// No strategy is viable.
    Unavailable(ConnectivityError),
}

/// Choose how to deliver a dictionary message.
///
/// Order: reachable, then installed, then paired-without-app, then unpaired.
pub fn select_route(flags: SessionFlags) -> Route {
    if flags.is_reachable {
        Route::Interactive
    } else if flags.is_paired_app_installed {
        Route::BackgroundContext
    } else if flags.is_paired {
        Route::Unavailable(ConnectivityError::CompanionAppNotInstalled)
    } else {
        Route::Unavailable(ConnectivityError::DeviceNotPaired)
    }
}

/// Choose whether raw bytes can be delivered. Only interactive delivery
/// carries bytes.
pub fn select_binary_route(flags: SessionFlags) -> Result<(), ConnectivityError> {
    if flags.is_reachable {
        Ok(())
    } else {
        Err(ConnectivityError::NotReachable)
    }
}

/// Sends messages through the session, one strategy per call.
pub struct MessageRouter {
    session: Arc<dyn ConnectivitySession>,
    span: Span,
}

impl MessageRouter {
    /// Create a router over `session`, logging inside `span`.
    pub fn new(session: Arc<dyn ConnectivitySession>, span: Span) -> Self {
        Self { session, span }
    }

    /// Deliver a dictionary message.
    pub async fn send(&self, message: &ConnectivityMessage) -> Result<SendOutcome, ConnectivityError> {
        let flags = SessionFlags::read(self.session.as_ref());
        let route = select_route(flags);
        debug!(parent: &self.span, ?route, keys = message.len(), "routing message");

        match route {
            Route::Interactive => {
                let reply = self
                    .session
                    .send_message(message.clone())
                    .instrument(self.span.clone())
                    .await?;
                Ok(SendOutcome::RepliedWith {
                    reply,
                    transport: TransportKind::Message,
                })
            }
            Route::BackgroundContext => {
                self.session.update_application_context(message.clone())?;
                Ok(SendOutcome::QueuedAsBackgroundContext {
                    transport: TransportKind::ApplicationContext,
                })
            }
            Route::Unavailable(error) => Err(error),
        }
    }

    /// Deliver raw bytes. Requires the peer to be reachable.
    pub async fn send_binary(&self, data: Bytes) -> Result<SendOutcome, ConnectivityError> {
        let flags = SessionFlags::read(self.session.as_ref());
        select_binary_route(flags)?;
        debug!(parent: &self.span, len = data.len(), "routing binary message");

        self.session
            .send_message_data(data)
            .instrument(self.span.clone())
            .await?;
        Ok(SendOutcome::RepliedWith {
            reply: ConnectivityMessage::new(),
            transport: TransportKind::MessageData,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
