//! Error type shared by every messaging resource.
//!
//! Producers, consumers, request-reply clients and topology managers all
//! report failures as [`ClientError`]. The lifecycle coordinator never wraps
//! these errors: whatever a resource returns is what the caller of
//! `MessagingClient::start` or `MessagingClient::stop` receives.

use thiserror::Error;

/// Errors that can occur while starting, stopping or using a messaging resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The operation observed a cancelled token and did not complete
    #[error("Operation cancelled")]
    Cancelled,

    /// Failed to connect to the broker
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to declare broker-side topology
    #[error("Topology declaration failed for '{destination}': {reason}")]
    TopologyFailed {
        /// The topic or address that could not be declared
        destination: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to send a message to a destination
    #[error("Send failed for '{destination}': {reason}")]
    SendFailed {
        /// The destination the message was addressed to
        destination: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to receive or dispatch a message
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// No reply arrived for a request before its deadline
    #[error("Request '{correlation_id}' timed out")]
    RequestTimedOut {
        /// Correlation id of the request that timed out
        correlation_id: String,
    },

    /// The resource was used before `start` completed, or after `stop`
    #[error("Resource '{0}' is not started")]
    NotStarted(String),

    /// Failed to encode or decode a message payload
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Generic error for other failures
    #[error("Messaging error: {0}")]
    Other(String),
}

impl ClientError {
    /// Check if this error is a cancellation rather than a real failure
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
