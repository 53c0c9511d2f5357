//! Error hierarchy for the paircast hub.
//!
//! - [`ConnectivityError`]: everything a consumer of the hub can be handed back
//! - [`TransportError`]: a failure reported verbatim by the session itself
//! - [`CodecError`]: a payload could not be turned into (or out of) a typed value
//!
//! All three are `Clone` because failures travel on the send-result broadcast
//! stream to every subscriber as well as back to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the underlying transport session.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{domain} error {code}: {message}")]
pub struct TransportError {
    /// Error domain of the transport (e.g. the platform framework name).
    pub domain: String,
    /// Transport-specific numeric code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(domain: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code,
            message: message.into(),
        }
    }
}

/// Failure turning a payload into a typed message or back.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The type has no binary representation.
    #[error("binary encoding is not supported for this message")]
    BinaryUnsupported,
    /// The payload is structurally invalid.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Broad classification of a [`ConnectivityError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The session cannot be used on this device at all.
    TransportUnavailable,
    /// A precondition for delivery does not hold right now.
    DeliveryImpossible,
    /// A message could not be encoded.
    Codec,
    /// The transport's own send primitive failed.
    TransportReported,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportUnavailable => write!(f, "transport_unavailable"),
            Self::DeliveryImpossible => write!(f, "delivery_impossible"),
            Self::Codec => write!(f, "codec"),
            Self::TransportReported => write!(f, "transport_reported"),
        }
    }
}

/// Top-level error type of the hub.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConnectivityError {
    /// The connectivity session type is not supported on this device.
    #[error("connectivity session is not supported on this device")]
    SessionUnsupported,

    /// The hub was constructed outside of a Tokio runtime.
    #[error("no Tokio runtime available to drive session callbacks")]
    RuntimeUnavailable,

    /// No companion device is paired.
    #[error("device is not paired")]
    DeviceNotPaired,

    /// A companion is paired but the companion app is not installed.
    #[error("companion app is not installed")]
    CompanionAppNotInstalled,

    /// The peer is not reachable for interactive delivery.
    #[error("peer is not reachable")]
    NotReachable,

    /// An outgoing typed message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[from] CodecError),

    /// The transport reported a failure.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl ConnectivityError {
    /// Error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SessionUnsupported | Self::RuntimeUnavailable => {
                ErrorCategory::TransportUnavailable
            }
            Self::DeviceNotPaired | Self::CompanionAppNotInstalled | Self::NotReachable => {
                ErrorCategory::DeliveryImpossible
            }
            Self::Encode(_) => ErrorCategory::Codec,
            Self::Transport(_) => ErrorCategory::TransportReported,
        }
    }

    /// Whether a delivery precondition (paired, installed, reachable) failed.
    pub fn is_delivery_impossible(&self) -> bool {
        self.category() == ErrorCategory::DeliveryImpossible
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
