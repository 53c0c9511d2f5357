//! # paircast-core
//!
//! Foundation types, errors, transport traits, and logging for the paircast hub.
//!
//! This crate provides the shared vocabulary that the other paircast crates depend on:
//!
//! - **Branded IDs**: [`ids::SubscriptionId`] as a newtype
//! - **Messages**: [`message::ConnectivityMessage`] and its [`message::MessageValue`] tree
//! - **State**: [`state::ConnectivityState`] snapshot and [`state::ActivationState`]
//! - **Outcomes**: [`outcome::ReceiveResult`], [`outcome::SendResult`], [`outcome::ReplyHandler`]
//! - **Errors**: [`errors::ConnectivityError`] taxonomy via `thiserror`
//! - **Transport**: [`transport::ConnectivitySession`] and [`transport::SessionDelegate`]
//! - **Codec**: [`codec::MessageDecoder`], [`codec::OutgoingMessage`], [`codec::JsonMessageDecoder`]
//! - **Logging**: [`logging::init_subscriber`] and log capture for tests
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `paircast-hub`.

#![deny(unsafe_code)]

pub mod codec;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod message;
pub mod outcome;
pub mod state;
pub mod transport;

pub use errors::{CodecError, ConnectivityError, ErrorCategory, TransportError};
pub use message::{ConnectivityMessage, MessageValue};
pub use outcome::{ReceiveContext, ReceiveResult, ReplyHandler, SendOutcome, SendResult, TransportKind};
pub use state::{ActivationState, ConnectivityState, DeviceSide, SessionFlags};
