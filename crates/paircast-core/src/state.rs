//! Connectivity state snapshot.
//!
//! [`ConnectivityState`] is immutable. Every update produces a brand-new value
//! through one of the `with_*` constructors; nothing mutates a snapshot in
//! place, so a reader holding an `Arc<ConnectivityState>` never observes a
//! half-applied update.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::TransportError;
use crate::transport::ConnectivitySession;

/// Activation state reported by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    /// The session is not activated and cannot be used.
    NotActivated,
    /// The session was active but is winding down (companion switch).
    Inactive,
    /// The session is active and can send and receive.
    Activated,
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotActivated => write!(f, "not_activated"),
            Self::Inactive => write!(f, "inactive"),
            Self::Activated => write!(f, "activated"),
        }
    }
}

/// Which side of the pairing this process runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSide {
    /// Phone-class device; pairing is explicit and observable.
    Phone,
    /// Wearable-class device; always implicitly paired with its phone.
    Wearable,
}

impl DeviceSide {
    /// Whether the paired flag carries information on this side.
    pub const fn tracks_pairing(self) -> bool {
        matches!(self, Self::Phone)
    }
}

/// Delivery-relevant flags read from the session at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionFlags {
    /// Interactive send is viable.
    pub is_reachable: bool,
    /// Queued send is viable.
    pub is_paired_app_installed: bool,
    /// A companion is paired (always `true` on the wearable side).
    pub is_paired: bool,
}

impl SessionFlags {
    /// Read the flags fresh from the session.
    pub fn read(session: &dyn ConnectivitySession) -> Self {
        Self {
            is_reachable: session.is_reachable(),
            is_paired_app_installed: session.is_paired_app_installed(),
            is_paired: match session.side() {
                DeviceSide::Phone => session.is_paired(),
                DeviceSide::Wearable => true,
            },
        }
    }
}

/// Immutable snapshot of the session's connectivity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectivityState {
    activation_state: Option<ActivationState>,
    activation_error: Option<TransportError>,
    is_reachable: bool,
    is_paired_app_installed: bool,
    is_paired: bool,
}

impl ConnectivityState {
    /// The pre-activation value: nothing known, nothing viable.
    pub const fn initial() -> Self {
        Self {
            activation_state: None,
            activation_error: None,
            is_reachable: false,
            is_paired_app_installed: false,
            is_paired: false,
        }
    }

    /// Build a snapshot from an activation event.
    ///
    /// `Activated` together with an error is a contradiction the caller must
    /// resolve before constructing.
    pub fn activated(
        activation_state: ActivationState,
        activation_error: Option<TransportError>,
        flags: SessionFlags,
    ) -> Self {
        debug_assert!(
            !(activation_state == ActivationState::Activated && activation_error.is_some()),
            "an activated session cannot carry an activation error"
        );
        Self {
            activation_state: Some(activation_state),
            activation_error,
            is_reachable: flags.is_reachable,
            is_paired_app_installed: flags.is_paired_app_installed,
            is_paired: flags.is_paired,
        }
    }

    /// Copy with only the reachability replaced.
    #[must_use]
    pub fn with_reachability(&self, is_reachable: bool) -> Self {
        Self {
            is_reachable,
            ..self.clone()
        }
    }

    /// Copy with only the companion install and paired flags replaced.
    #[must_use]
    pub fn with_companion_state(&self, is_paired_app_installed: bool, is_paired: bool) -> Self {
        Self {
            is_paired_app_installed,
            is_paired,
            ..self.clone()
        }
    }

    /// Activation state, `None` before the first activation event.
    pub fn activation_state(&self) -> Option<ActivationState> {
        self.activation_state
    }

    /// Error captured at the last activation event.
    pub fn activation_error(&self) -> Option<&TransportError> {
        self.activation_error.as_ref()
    }

    /// Combined activation outcome, `None` before the first activation event.
    pub fn activation_result(&self) -> Option<Result<ActivationState, TransportError>> {
        let state = self.activation_state?;
        Some(match &self.activation_error {
            Some(err) => Err(err.clone()),
            None => Ok(state),
        })
    }

    /// Interactive send is viable.
    pub fn is_reachable(&self) -> bool {
        self.is_reachable
    }

    /// Queued send is viable.
    pub fn is_paired_app_installed(&self) -> bool {
        self.is_paired_app_installed
    }

    /// A companion is paired.
    pub fn is_paired(&self) -> bool {
        self.is_paired
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::initial()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
