//! Typed message encoding and decoding.
//!
//! The hub is agnostic about payload framing. Incoming payloads are turned
//! into a domain type `M` by a [`MessageDecoder`]; outgoing domain values
//! implement [`OutgoingMessage`] and choose whether they also have a binary
//! representation.
//!
//! [`JsonMessageDecoder`] and [`JsonMessage`] cover the common case of serde
//! types carried as dictionaries or JSON bytes.

use std::marker::PhantomData;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::CodecError;
use crate::message::ConnectivityMessage;

/// Turns raw payloads into typed messages.
pub trait MessageDecoder<M>: Send + Sync {
    /// Decode a dictionary payload.
    fn decode(&self, message: &ConnectivityMessage) -> Result<M, CodecError>;

    /// Decode a raw-bytes payload.
    fn decode_binary(&self, data: &[u8]) -> Result<M, CodecError> {
        let _ = data;
        Err(CodecError::BinaryUnsupported)
    }
}

/// A typed value that can be sent to the peer.
pub trait OutgoingMessage: Send + Sync {
    /// Dictionary representation, always available.
    fn encode(&self) -> Result<ConnectivityMessage, CodecError>;

    /// Binary representation. `None` when the type is dictionary-only.
    fn encode_binary(&self) -> Option<Result<Bytes, CodecError>> {
        None
    }
}

/// Per-send options for typed messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Use the dictionary path even when the message has a binary form.
    pub force_dictionary: bool,
}

impl SendOptions {
    /// Options forcing the dictionary transport.
    pub const fn dictionary() -> Self {
        Self {
            force_dictionary: true,
        }
    }
}

/// Serde-backed decoder: dictionaries via `serde_json::Value`, bytes as JSON.
pub struct JsonMessageDecoder<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> JsonMessageDecoder<M> {
    /// Create a decoder for `M`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<M> Default for JsonMessageDecoder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: DeserializeOwned> MessageDecoder<M> for JsonMessageDecoder<M> {
    fn decode(&self, message: &ConnectivityMessage) -> Result<M, CodecError> {
        serde_json::from_value(message.to_json()).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn decode_binary(&self, data: &[u8]) -> Result<M, CodecError> {
        serde_json::from_slice(data).map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

/// Serde value sent as a dictionary, and optionally as JSON bytes.
#[derive(Clone, Debug)]
pub struct JsonMessage<T> {
    value: T,
    binary: bool,
}

impl<T> JsonMessage<T> {
    /// Dictionary-only message.
    pub fn new(value: T) -> Self {
        Self {
            value,
            binary: false,
        }
    }

    /// Message that prefers the binary transport.
    pub fn binary(value: T) -> Self {
        Self {
            value,
            binary: true,
        }
    }
}

impl<T: Serialize + Send + Sync> OutgoingMessage for JsonMessage<T> {
    fn encode(&self) -> Result<ConnectivityMessage, CodecError> {
        let value =
            serde_json::to_value(&self.value).map_err(|e| CodecError::Malformed(e.to_string()))?;
        ConnectivityMessage::from_json(value)
    }

    fn encode_binary(&self) -> Option<Result<Bytes, CodecError>> {
        self.binary.then(|| {
            serde_json::to_vec(&self.value)
                .map(Bytes::from)
                .map_err(|e| CodecError::Malformed(e.to_string()))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
