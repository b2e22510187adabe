//! Mapping between [`Message`] and Kafka records.
//!
//! The correlation id and reply-to destination travel as the
//! `correlation-id` and `reply-to` record headers. Other headers pass
//! through unchanged. Keys are UTF-8; invalid bytes are replaced.

use messaging_host_core::Message;
use messaging_host_core::message::{CORRELATION_ID_HEADER, REPLY_TO_HEADER};
use rdkafka::message::{Header, Headers, Message as KafkaMessage, OwnedHeaders};

/// Build the Kafka headers for `message`.
pub(crate) fn to_headers(message: &Message) -> OwnedHeaders {
    let mut headers = OwnedHeaders::new_with_capacity(message.headers.len() + 2);

    for (key, value) in &message.headers {
        headers = headers.insert(Header {
            key: key.as_str(),
            value: Some(value.as_slice()),
        });
    }
    if let Some(correlation_id) = &message.correlation_id {
        headers = headers.insert(Header {
            key: CORRELATION_ID_HEADER,
            value: Some(correlation_id.as_str()),
        });
    }
    if let Some(reply_to) = &message.reply_to {
        headers = headers.insert(Header {
            key: REPLY_TO_HEADER,
            value: Some(reply_to.as_str()),
        });
    }

    headers
}

/// Convert a received Kafka record into a [`Message`].
pub(crate) fn from_record<M: KafkaMessage>(record: &M) -> Message {
    let mut message = Message::new(record.payload().map(<[u8]>::to_vec).unwrap_or_default());
    message.key = record
        .key()
        .map(|key| String::from_utf8_lossy(key).into_owned());

    if let Some(headers) = record.headers() {
        for header in headers.iter() {
            let value = header.value.unwrap_or_default();
            match header.key {
                CORRELATION_ID_HEADER => {
                    message.correlation_id = Some(String::from_utf8_lossy(value).into_owned());
                },
                REPLY_TO_HEADER => {
                    message.reply_to = Some(String::from_utf8_lossy(value).into_owned());
                },
                key => message.headers.push((key.to_string(), value.to_vec())),
            }
        }
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::message::{OwnedMessage, Timestamp};

    fn record(payload: &[u8], key: Option<&str>, headers: OwnedHeaders) -> OwnedMessage {
        OwnedMessage::new(
            Some(payload.to_vec()),
            key.map(|k| k.as_bytes().to_vec()),
            "orders".to_string(),
            Timestamp::NotAvailable,
            0,
            42,
            Some(headers),
        )
    }

    #[test]
    fn routing_headers_are_lifted_out_of_application_headers() {
        let message = Message::new(b"ping".to_vec())
            .with_key("order-1")
            .with_header("tenant", "acme")
            .with_correlation_id("abc-123")
            .with_reply_to("rpc-replies");

        let received = from_record(&record(b"ping", Some("order-1"), to_headers(&message)));

        assert_eq!(received, message);
    }

    #[test]
    fn record_without_payload_or_headers_becomes_empty_message() {
        let bare = OwnedMessage::new(
            None,
            None,
            "orders".to_string(),
            Timestamp::NotAvailable,
            0,
            0,
            None,
        );

        let received = from_record(&bare);

        assert_eq!(received, Message::default());
    }

    #[test]
    fn header_order_is_preserved() {
        let message = Message::new(Vec::new())
            .with_header("b", "2")
            .with_header("a", "1");

        let received = from_record(&record(b"", None, to_headers(&message)));

        assert_eq!(received.headers, message.headers);
    }
}
