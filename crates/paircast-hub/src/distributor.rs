//! Message distributor: fans incoming payloads out to the raw and typed
//! audiences.
//!
//! Raw delivery of dictionaries and background contexts is unconditional and
//! happens first. Decoding is attempted afterwards and a decode failure only
//! affects the typed audience.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{Span, debug, warn};

use paircast_core::codec::MessageDecoder;
use paircast_core::{
    CodecError, ConnectivityMessage, ReceiveContext, ReceiveResult, ReplyHandler, TransportError,
};

use crate::registry::MessageStreams;

/// Routes incoming payloads to raw-message and typed-message subscribers.
pub struct MessageDistributor<M> {
    streams: Arc<MessageStreams<M>>,
    decoder: Option<Arc<dyn MessageDecoder<M>>>,
    strict: bool,
    span: Span,
}

impl<M: Clone> MessageDistributor<M> {
    /// Create a distributor. Without a decoder only raw delivery happens.
    ///
    /// With `strict` set, a decode failure panics in debug builds.
    pub fn new(
        streams: Arc<MessageStreams<M>>,
        decoder: Option<Arc<dyn MessageDecoder<M>>>,
        strict: bool,
        span: Span,
    ) -> Self {
        Self {
            streams,
            decoder,
            strict,
            span,
        }
    }

    /// An interactive dictionary message arrived.
    pub fn handle_message(&self, message: ConnectivityMessage, reply: Option<ReplyHandler>) {
        let delivered = self.streams.raw_message.broadcast(&ReceiveResult {
            message: message.clone(),
            context: ReceiveContext::Message(reply),
        });
        debug!(parent: &self.span, keys = message.len(), delivered, "message received");
        self.decode_and_publish(&message, "message");
    }

    /// A queued application context arrived. Decoding is skipped when the
    /// transport reported `error` with it.
    pub fn handle_application_context(
        &self,
        context: ConnectivityMessage,
        error: Option<TransportError>,
    ) {
        let delivered = self.streams.raw_message.broadcast(&ReceiveResult {
            message: context.clone(),
            context: ReceiveContext::BackgroundContext,
        });
        debug!(parent: &self.span, keys = context.len(), delivered, "application context received");

        match error {
            None => self.decode_and_publish(&context, "application_context"),
            Some(error) => {
                warn!(parent: &self.span, %error, "application context arrived with an error, not decoding");
            }
        }
    }

    /// Raw bytes arrived. Bytes have no raw-message shape, so only the typed
    /// audience can receive them.
    pub fn handle_binary_message(&self, data: Bytes, reply: Option<ReplyHandler>) {
        if reply.is_some() {
            debug!(parent: &self.span, "binary message reply handler not forwarded");
        }
        let Some(decoder) = &self.decoder else {
            debug!(parent: &self.span, len = data.len(), "binary message dropped, no decoder");
            return;
        };
        match decoder.decode_binary(&data) {
            Ok(typed) => {
                let delivered = self.streams.typed_message.broadcast(&typed);
                debug!(parent: &self.span, len = data.len(), delivered, "binary message decoded");
            }
            Err(error) => self.decode_failed("message_data", &error),
        }
    }

    fn decode_and_publish(&self, message: &ConnectivityMessage, source: &'static str) {
        let Some(decoder) = &self.decoder else {
            return;
        };
        match decoder.decode(message) {
            Ok(typed) => {
                let _ = self.streams.typed_message.broadcast(&typed);
            }
            Err(error) => self.decode_failed(source, &error),
        }
    }

    fn decode_failed(&self, source: &'static str, error: &CodecError) {
        if self.strict && cfg!(debug_assertions) {
            panic!("failed to decode incoming {source}: {error}");
        }
        warn!(parent: &self.span, source, %error, "failed to decode incoming payload");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubscriptionRegistry;
    use crate::subscription::Subscription;
    use assert_matches::assert_matches;
    use paircast_core::codec::JsonMessageDecoder;
    use paircast_core::logging::capture_logs;
    use serde::Deserialize;
    use tracing::Level;

    #[derive(Clone, Debug, PartialEq, Deserialize)]
    struct Note {
        text: String,
    }

    fn distributor(
        registry: &SubscriptionRegistry<Note>,
        with_decoder: bool,
    ) -> MessageDistributor<Note> {
        let decoder = with_decoder
            .then(|| Arc::new(JsonMessageDecoder::<Note>::new()) as Arc<dyn MessageDecoder<Note>>);
        MessageDistributor::new(Arc::clone(&registry.messages), decoder, false, Span::none())
    }

    #[test]
    fn message_reaches_raw_and_typed() {
        let registry = SubscriptionRegistry::new();
        let mut raw = Subscription::attach(&registry.messages.raw_message, || None);
        let mut typed = Subscription::attach(&registry.messages.typed_message, || None);

        distributor(&registry, true)
            .handle_message(ConnectivityMessage::new().with("text", "hi"), None);

        let received = raw.try_recv().unwrap();
        assert_eq!(received.message.get("text").and_then(|v| v.as_str()), Some("hi"));
        assert_matches!(received.context, ReceiveContext::Message(None));
        assert_eq!(typed.try_recv(), Some(Note { text: "hi".into() }));
    }

    #[test]
    fn decode_failure_keeps_raw_delivery() {
        let (logs, _guard) = capture_logs();
        let registry = SubscriptionRegistry::new();
        let mut raw = Subscription::attach(&registry.messages.raw_message, || None);
        let mut typed = Subscription::attach(&registry.messages.typed_message, || None);

        distributor(&registry, true)
            .handle_message(ConnectivityMessage::new().with("other", 1_i64), None);

        assert!(raw.try_recv().is_some());
        assert!(raw.try_recv().is_none());
        assert_eq!(typed.try_recv(), None);
        assert!(logs.has_event(Level::WARN, "failed to decode"));
        let events = logs.events();
        let warning = events.iter().find(|e| e.level == Level::WARN).unwrap();
        assert_eq!(warning.field("source"), Some("message"));
    }

    #[test]
    fn reply_handler_travels_with_raw_message() {
        let registry = SubscriptionRegistry::new();
        let mut raw = Subscription::attach(&registry.messages.raw_message, || None);
        let handler = ReplyHandler::new(|_| {});

        distributor(&registry, false).handle_message(ConnectivityMessage::new(), Some(handler));

        let received = raw.try_recv().unwrap();
        assert_matches!(received.context, ReceiveContext::Message(Some(h)) => {
            assert!(h.reply(ConnectivityMessage::new()));
        });
    }

    #[test]
    fn without_decoder_only_raw_is_delivered() {
        let registry = SubscriptionRegistry::new();
        let mut raw = Subscription::attach(&registry.messages.raw_message, || None);
        let mut typed = Subscription::attach(&registry.messages.typed_message, || None);

        distributor(&registry, false)
            .handle_message(ConnectivityMessage::new().with("text", "hi"), None);

        assert!(raw.try_recv().is_some());
        assert_eq!(typed.try_recv(), None);
    }

    #[test]
    fn application_context_is_tagged_background() {
        let registry = SubscriptionRegistry::new();
        let mut raw = Subscription::attach(&registry.messages.raw_message, || None);
        let mut typed = Subscription::attach(&registry.messages.typed_message, || None);

        distributor(&registry, true)
            .handle_application_context(ConnectivityMessage::new().with("text", "ctx"), None);

        assert_matches!(raw.try_recv().unwrap().context, ReceiveContext::BackgroundContext);
        assert_eq!(typed.try_recv(), Some(Note { text: "ctx".into() }));
    }

    #[test]
    fn application_context_with_error_is_not_decoded() {
        let (logs, _guard) = capture_logs();
        let registry = SubscriptionRegistry::new();
        let mut raw = Subscription::attach(&registry.messages.raw_message, || None);
        let mut typed = Subscription::attach(&registry.messages.typed_message, || None);

        distributor(&registry, true).handle_application_context(
            ConnectivityMessage::new().with("text", "stale"),
            Some(TransportError::new("fake", 2, "partial")),
        );

        assert!(raw.try_recv().is_some());
        assert_eq!(typed.try_recv(), None);
        assert!(logs.has_event(Level::WARN, "not decoding"));
    }

    #[test]
    fn binary_message_reaches_typed_only() {
        let registry = SubscriptionRegistry::new();
        let mut raw = Subscription::attach(&registry.messages.raw_message, || None);
        let mut typed = Subscription::attach(&registry.messages.typed_message, || None);

        distributor(&registry, true)
            .handle_binary_message(Bytes::from_static(br#"{"text":"bin"}"#), None);

        assert!(raw.try_recv().is_none());
        assert_eq!(typed.try_recv(), Some(Note { text: "bin".into() }));
    }

    #[test]
    fn undecodable_binary_is_dropped_with_warning() {
        let (logs, _guard) = capture_logs();
        let registry = SubscriptionRegistry::new();
        let mut raw = Subscription::attach(&registry.messages.raw_message, || None);
        let mut typed = Subscription::attach(&registry.messages.typed_message, || None);

        distributor(&registry, true).handle_binary_message(Bytes::from_static(b"\x00"), None);

        assert!(raw.try_recv().is_none());
        assert_eq!(typed.try_recv(), None);
        assert_eq!(logs.count_at_level(Level::WARN), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "failed to decode incoming message")]
    fn strict_decoding_panics_in_debug() {
        let registry = SubscriptionRegistry::<Note>::new();
        let strict = MessageDistributor::new(
            Arc::clone(&registry.messages),
            Some(Arc::new(JsonMessageDecoder::<Note>::new()) as Arc<dyn MessageDecoder<Note>>),
            true,
            Span::none(),
        );
        strict.handle_message(ConnectivityMessage::new(), None);
    }
}
