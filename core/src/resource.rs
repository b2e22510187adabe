//! Lifecycle traits for the resources a messaging client is composed of.
//!
//! A messaging client is made of four kinds of resource, each with its own
//! lifecycle contract:
//!
//! | Resource               | Startup                   | Shutdown |
//! |------------------------|---------------------------|----------|
//! | [`Producer`]           | `start(cancellation)`     | `stop()` |
//! | [`RequestReplyClient`] | `start(cancellation)`     | `stop()` |
//! | [`TopologyManager`]    | `create_topology(cancel)` | none     |
//! | [`Consumer`]           | `start(cancellation)`     | `stop()` |
//!
//! Topology is a one-shot declaration, not a held resource, so topology
//! managers have nothing to stop. Stop operations take no cancellation token:
//! once shutdown reaches a resource, that resource is expected to run its stop
//! to completion or fail.
//!
//! # Dyn Compatibility
//!
//! Like the rest of the workspace, these traits return
//! `Pin<Box<dyn Future>>` instead of using `async fn`, so resources can be
//! held as `Arc<dyn Producer>` and friends by the coordinator.
//!
//! # Example
//!
//! ```
//! use messaging_host_core::resource::{LifecycleFuture, Producer};
//! use messaging_host_core::CancellationToken;
//!
//! struct AuditProducer;
//!
//! impl Producer for AuditProducer {
//!     fn name(&self) -> &str {
//!         "audit"
//!     }
//!
//!     fn start(&self, _cancellation: CancellationToken) -> LifecycleFuture<'_> {
//!         Box::pin(async { Ok(()) })
//!     }
//!
//!     fn stop(&self) -> LifecycleFuture<'_> {
//!         Box::pin(async { Ok(()) })
//!     }
//! }
//! ```

use crate::error::ClientError;
use crate::message::Message;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Future returned by every lifecycle operation.
pub type LifecycleFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + 'a>>;

/// A component that sends messages to a broker destination.
pub trait Producer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Open the producer. May suspend until connected.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] if `cancellation` fires first, or
    /// whatever connection error the underlying client reports.
    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_>;

    /// Close the producer, flushing anything still in flight.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the underlying client.
    fn stop(&self) -> LifecycleFuture<'_>;
}

/// A component implementing correlated request/response over the broker.
pub trait RequestReplyClient: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Open the request channel and the reply listener.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] if `cancellation` fires first, or
    /// whatever connection error the underlying client reports.
    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_>;

    /// Close the client. Requests still waiting for a reply fail.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the underlying client.
    fn stop(&self) -> LifecycleFuture<'_>;
}

/// A component that declares broker-side topology before messaging begins.
pub trait TopologyManager: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Declare the topology. Declaring something that already exists succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] if `cancellation` fires first, or
    /// [`ClientError::TopologyFailed`] if the broker rejects a declaration.
    fn create_topology(&self, cancellation: CancellationToken) -> LifecycleFuture<'_>;
}

/// A component that receives messages from a broker destination.
pub trait Consumer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Subscribe and begin dispatching messages.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] if `cancellation` fires first, or
    /// whatever subscription error the underlying client reports.
    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_>;

    /// Stop dispatching and leave the subscription.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the underlying client.
    fn stop(&self) -> LifecycleFuture<'_>;
}

/// Application callback invoked by a consumer for each received message.
///
/// Handlers must be idempotent: delivery is at-least-once and a message may
/// be handed to the handler more than once after a restart.
pub trait MessageHandler: Send + Sync {
    /// Handle one message.
    ///
    /// # Errors
    ///
    /// A returned error is logged by the consumer; the message is still
    /// acknowledged so a poison message cannot stall the subscription.
    fn handle(&self, message: Message) -> LifecycleFuture<'_>;
}

impl<F, Fut> MessageHandler for F
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ClientError>> + Send + 'static,
{
    fn handle(&self, message: Message) -> LifecycleFuture<'_> {
        Box::pin(self(message))
    }
}
