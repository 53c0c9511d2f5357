//! Raw key/value messages exchanged with the paired peer.
//!
//! A [`ConnectivityMessage`] is the property-list-safe dictionary the transport
//! carries: string keys mapped to [`MessageValue`]s (strings, numbers,
//! booleans, dates, raw bytes, and nested arrays/dictionaries of the same).
//! Key order is irrelevant; the map is kept sorted so equality and debug
//! output are deterministic.
//!
//! Conversions to and from [`serde_json::Value`] exist for decoders built on
//! serde. Dates become RFC 3339 strings and bytes become standard base64, so
//! the JSON direction is lossy for those two variants.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::CodecError;

/// Key under which binary sends are projected into a [`ConnectivityMessage`].
pub const BINARY_PROJECTION_KEY: &str = "data";

/// A single property-list-safe value.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageValue {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Point in time.
    Date(DateTime<Utc>),
    /// Raw bytes.
    Data(Bytes),
    /// Ordered list of values.
    Array(Vec<MessageValue>),
    /// Nested dictionary.
    Dictionary(BTreeMap<String, MessageValue>),
}

impl MessageValue {
    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Byte payload, if this is raw data.
    pub fn as_data(&self) -> Option<&Bytes> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Convert into a JSON value. Dates become RFC 3339 strings, bytes become
    /// base64 strings, and non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(n) => Value::from(*n),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Date(d) => Value::String(d.to_rfc3339()),
            Self::Data(d) => Value::String(STANDARD.encode(d)),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Dictionary(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<Value> for MessageValue {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Null => {
                return Err(CodecError::Malformed(
                    "null has no property-list representation".into(),
                ));
            }
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            // Absent keys stand for `None`; a null entry is simply omitted.
            Value::Object(map) => Self::Dictionary(
                map.into_iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| Self::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

impl From<bool> for MessageValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for MessageValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for MessageValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for MessageValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for MessageValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<Utc>> for MessageValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<Bytes> for MessageValue {
    fn from(d: Bytes) -> Self {
        Self::Data(d)
    }
}

/// A property-list-safe dictionary. No identity beyond its content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectivityMessage(BTreeMap<String, MessageValue>);

impl ConnectivityMessage {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Projection used for binary sends: `{"data": <bytes>}`.
    pub fn binary_projection(data: Bytes) -> Self {
        let mut message = Self::new();
        let _ = message.insert(BINARY_PROJECTION_KEY, MessageValue::Data(data));
        message
    }

    /// Insert a value, returning the previous value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MessageValue>,
    ) -> Option<MessageValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MessageValue>) -> Self {
        let _ = self.insert(key, value);
        self
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&MessageValue> {
        self.0.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the message has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MessageValue)> {
        self.0.iter()
    }

    /// Convert into a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Build a message from a JSON object. Keys holding `null` are dropped;
    /// non-object input and `null` inside arrays are rejected.
    pub fn from_json(value: Value) -> Result<Self, CodecError> {
        match MessageValue::try_from(value)? {
            MessageValue::Dictionary(map) => Ok(Self(map)),
            other => Err(CodecError::Malformed(format!(
                "expected a dictionary, found {other:?}"
            ))),
        }
    }
}

impl FromIterator<(String, MessageValue)> for ConnectivityMessage {
    fn from_iter<I: IntoIterator<Item = (String, MessageValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, MessageValue>> for ConnectivityMessage {
    fn from(map: BTreeMap<String, MessageValue>) -> Self {
        Self(map)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
