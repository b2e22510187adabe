//! Broker-agnostic message envelope.
//!
//! A [`Message`] carries an opaque byte payload plus the routing metadata the
//! resources need: an optional partitioning key, free-form headers, and the
//! correlation id / reply-to pair used by request-reply clients.
//!
//! Typed payloads are encoded with `bincode`:
//!
//! ```
//! use messaging_host_core::message::Message;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct OrderPlaced {
//!     order_id: u64,
//! }
//!
//! # fn main() -> Result<(), messaging_host_core::ClientError> {
//! let message = Message::encode(&OrderPlaced { order_id: 7 })?.with_key("order-7");
//! let decoded: OrderPlaced = message.decode()?;
//! assert_eq!(decoded, OrderPlaced { order_id: 7 });
//! # Ok(())
//! # }
//! ```

use crate::error::ClientError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Header name carrying the request/reply correlation id.
pub const CORRELATION_ID_HEADER: &str = "correlation-id";

/// Header name carrying the destination replies should be sent to.
pub const REPLY_TO_HEADER: &str = "reply-to";

/// A message travelling to or from the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Partitioning key
    pub key: Option<String>,
    /// Opaque payload bytes
    pub payload: Vec<u8>,
    /// Application headers, in insertion order
    pub headers: Vec<(String, Vec<u8>)>,
    /// Correlation id linking a reply to its request
    pub correlation_id: Option<String>,
    /// Destination a reply should be sent to
    pub reply_to: Option<String>,
}

impl Message {
    /// Create a message with the given payload and no metadata.
    #[must_use]
    pub const fn new(payload: Vec<u8>) -> Self {
        Self {
            key: None,
            payload,
            headers: Vec::new(),
            correlation_id: None,
            reply_to: None,
        }
    }

    /// Create a message whose payload is `value` encoded with `bincode`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if `value` cannot be encoded.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, ClientError> {
        let payload = bincode::serialize(value)
            .map_err(|e| ClientError::Serialization(format!("Failed to encode payload: {e}")))?;
        Ok(Self::new(payload))
    }

    /// Decode the payload with `bincode`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if the payload is not a valid `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        bincode::deserialize(&self.payload)
            .map_err(|e| ClientError::Serialization(format!("Failed to decode payload: {e}")))
    }

    /// Set the partitioning key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append an application header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the reply-to destination.
    #[must_use]
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Look up the first application header with the given name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(header, _)| header == name)
            .map(|(_, value)| value.as_slice())
    }

    /// Build a reply to this message: same correlation id, no reply-to.
    #[must_use]
    pub fn reply(&self, payload: Vec<u8>) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            ..Self::new(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_returns_first_match() {
        let message = Message::new(Vec::new())
            .with_header("tenant", "a")
            .with_header("tenant", "b");

        assert_eq!(message.header("tenant"), Some(&b"a"[..]));
        assert_eq!(message.header("missing"), None);
    }

    #[test]
    fn reply_keeps_correlation_id_only() {
        let request = Message::new(b"ping".to_vec())
            .with_key("k")
            .with_correlation_id("abc")
            .with_reply_to("replies");

        let reply = request.reply(b"pong".to_vec());

        assert_eq!(reply.correlation_id.as_deref(), Some("abc"));
        assert_eq!(reply.reply_to, None);
        assert_eq!(reply.key, None);
        assert_eq!(reply.payload, b"pong");
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let message = Message::new(vec![1]);
        let result: Result<u64, _> = message.decode();
        assert!(matches!(result, Err(ClientError::Serialization(_))));
    }
}
