//! # Messaging Host Runtime
//!
//! Lifecycle coordination for messaging clients.
//!
//! This crate provides the coordinator that sequences startup and shutdown of
//! the resources a messaging client is composed of, and a host that ties the
//! coordinator to a process lifecycle.
//!
//! ## Core Components
//!
//! - **`MessagingClient`**: starts producers, request-reply clients, topology
//!   and consumers in order, and stops them in the reverse-ish order
//! - **`MessagingHost`**: start, wait for a shutdown signal, stop within a deadline
//! - **`HostConfig`**: start and shutdown timeouts
//!
//! ## Example
//!
//! ```ignore
//! use messaging_host_runtime::{HostConfig, MessagingClient, MessagingHost};
//!
//! let client = MessagingClient::builder()
//!     .producer(producer)
//!     .request_reply_client(rpc)
//!     .topology_manager(topology)
//!     .consumer(consumer)
//!     .build();
//!
//! MessagingHost::new(client, HostConfig::default())
//!     .run_until_ctrl_c()
//!     .await?;
//! ```

/// Lifecycle coordinator
pub mod client;

/// Host configuration
pub mod config;

/// Process-level host runner
pub mod host;

/// Error types for the host runner
pub mod error {
    use messaging_host_core::ClientError;
    use std::time::Duration;
    use thiserror::Error;

    /// Errors that can occur while hosting a messaging client
    ///
    /// Resource errors are carried unchanged inside [`HostError::Start`] and
    /// [`HostError::Stop`].
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum HostError {
        /// A resource failed while the client was starting
        #[error("Messaging client failed to start: {0}")]
        Start(#[source] ClientError),

        /// A resource failed while the client was stopping
        #[error("Messaging client failed to stop: {0}")]
        Stop(#[source] ClientError),

        /// Startup did not finish within the configured timeout
        #[error("Messaging client did not start within {0:?}")]
        StartTimeout(Duration),

        /// Shutdown did not finish within the configured timeout
        #[error("Messaging client did not stop within {0:?}")]
        ShutdownTimeout(Duration),
    }

    impl HostError {
        /// The resource error behind this failure, if any
        #[must_use]
        pub const fn client_error(&self) -> Option<&ClientError> {
            match self {
                Self::Start(error) | Self::Stop(error) => Some(error),
                Self::StartTimeout(_) | Self::ShutdownTimeout(_) => None,
            }
        }
    }
}

// Re-export commonly used items
pub use client::{MessagingClient, MessagingClientBuilder};
pub use config::HostConfig;
pub use error::HostError;
pub use host::MessagingHost;
