//! # Messaging Host Core
//!
//! Core traits and types for hosting messaging clients.
//!
//! A messaging client is composed of producers, request-reply clients,
//! topology managers and consumers. This crate defines the lifecycle contract
//! each of them exposes, the [`ClientError`] they all report, and the
//! [`Message`] envelope they exchange. The coordinator that sequences them
//! lives in `messaging-host-runtime`; broker implementations live in
//! `messaging-host-redpanda`.
//!
//! ## Modules
//!
//! - [`resource`]: `Producer`, `RequestReplyClient`, `TopologyManager`,
//!   `Consumer` and `MessageHandler`
//! - [`message`]: the message envelope and header names
//! - [`error`]: the shared error type

/// Error type shared by every messaging resource
pub mod error;

/// Message envelope
pub mod message;

/// Lifecycle traits for messaging resources
pub mod resource;

// Re-export commonly used types
pub use error::ClientError;
pub use message::Message;
pub use resource::{
    Consumer, LifecycleFuture, MessageHandler, Producer, RequestReplyClient, TopologyManager,
};
pub use tokio_util::sync::CancellationToken;
