//! Lifecycle coordinator for a composed messaging client.
//!
//! [`MessagingClient`] owns four ordered collections of resources and drives
//! them through startup and shutdown in a fixed, asymmetric order:
//!
//! ```text
//! start:  producers ─► request-reply clients ─► topology managers ─► consumers
//! stop:   consumers ─► producers ─► request-reply clients
//! ```
//!
//! Topology managers only declare topology and have nothing to stop.
//!
//! Every operation is awaited one at a time. The first failure aborts the
//! traversal: later resources are never touched and nothing already started
//! is rolled back. The failing resource's error is returned as-is.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging_host_runtime::MessagingClient;
//! use messaging_host_core::CancellationToken;
//!
//! let client = MessagingClient::builder()
//!     .producer(orders_producer)
//!     .topology_manager(topology)
//!     .consumer(orders_consumer)
//!     .build();
//!
//! let shutdown = CancellationToken::new();
//! client.start(shutdown.clone()).await?;
//! // ... serve until asked to stop ...
//! client.stop(shutdown).await?;
//! ```

use messaging_host_core::{
    CancellationToken, ClientError, Consumer, Producer, RequestReplyClient, TopologyManager,
};
use std::sync::Arc;
use std::time::Instant;

/// Coordinator that starts and stops the resources of a messaging client.
///
/// Resource collections are fixed at construction time and iterated in
/// registration order.
#[derive(Clone, Default)]
pub struct MessagingClient {
    producers: Vec<Arc<dyn Producer>>,
    request_reply_clients: Vec<Arc<dyn RequestReplyClient>>,
    topology_managers: Vec<Arc<dyn TopologyManager>>,
    consumers: Vec<Arc<dyn Consumer>>,
}

impl MessagingClient {
    /// Create a coordinator from the four resource collections.
    #[must_use]
    pub const fn new(
        producers: Vec<Arc<dyn Producer>>,
        request_reply_clients: Vec<Arc<dyn RequestReplyClient>>,
        topology_managers: Vec<Arc<dyn TopologyManager>>,
        consumers: Vec<Arc<dyn Consumer>>,
    ) -> Self {
        Self {
            producers,
            request_reply_clients,
            topology_managers,
            consumers,
        }
    }

    /// Create a builder that registers resources one at a time.
    #[must_use]
    pub fn builder() -> MessagingClientBuilder {
        MessagingClientBuilder::default()
    }

    /// Number of registered producers
    #[must_use]
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Number of registered request-reply clients
    #[must_use]
    pub fn request_reply_client_count(&self) -> usize {
        self.request_reply_clients.len()
    }

    /// Number of registered topology managers
    #[must_use]
    pub fn topology_manager_count(&self) -> usize {
        self.topology_managers.len()
    }

    /// Number of registered consumers
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Check if no resources of any kind are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
            && self.request_reply_clients.is_empty()
            && self.topology_managers.is_empty()
            && self.consumers.is_empty()
    }

    /// Start every resource in order.
    ///
    /// 1. Start every producer
    /// 2. Start every request-reply client
    /// 3. Create topology for every topology manager
    /// 4. Start every consumer
    ///
    /// `cancellation` is handed to every call and checked before each one.
    ///
    /// # Errors
    ///
    /// Returns the first error any resource reports, unchanged, or
    /// [`ClientError::Cancelled`] if `cancellation` fires between calls.
    /// Resources after the failing one are never started, and resources
    /// already started stay started.
    pub async fn start(&self, cancellation: CancellationToken) -> Result<(), ClientError> {
        tracing::info!(
            producers = self.producers.len(),
            request_reply_clients = self.request_reply_clients.len(),
            topology_managers = self.topology_managers.len(),
            consumers = self.consumers.len(),
            "Starting messaging client"
        );

        let started_at = Instant::now();
        let result = self.start_all(&cancellation).await;
        let elapsed = started_at.elapsed().as_secs_f64();

        match &result {
            Ok(()) => {
                tracing::info!(duration_seconds = elapsed, "Messaging client started");
                metrics::counter!("messaging.client.start.completed").increment(1);
                metrics::histogram!("messaging.client.start.duration_seconds").record(elapsed);
            },
            Err(error) => {
                tracing::error!(error = %error, "Messaging client failed to start");
                metrics::counter!("messaging.client.start.failed").increment(1);
            },
        }

        result
    }

    /// Stop every resource in order.
    ///
    /// 1. Stop every consumer
    /// 2. Stop every producer
    /// 3. Stop every request-reply client
    ///
    /// Resource stops take no token; `cancellation` is only checked between
    /// calls, so a stop already in progress always runs to completion.
    ///
    /// # Errors
    ///
    /// Returns the first error any resource reports, unchanged, or
    /// [`ClientError::Cancelled`] if `cancellation` fires between calls.
    /// Resources after the failing one are never stopped.
    pub async fn stop(&self, cancellation: CancellationToken) -> Result<(), ClientError> {
        tracing::info!("Stopping messaging client");

        let started_at = Instant::now();
        let result = self.stop_all(&cancellation).await;
        let elapsed = started_at.elapsed().as_secs_f64();

        match &result {
            Ok(()) => {
                tracing::info!(duration_seconds = elapsed, "Messaging client stopped");
                metrics::counter!("messaging.client.stop.completed").increment(1);
                metrics::histogram!("messaging.client.stop.duration_seconds").record(elapsed);
            },
            Err(error) => {
                tracing::error!(error = %error, "Messaging client failed to stop");
                metrics::counter!("messaging.client.stop.failed").increment(1);
            },
        }

        result
    }

    async fn start_all(&self, cancellation: &CancellationToken) -> Result<(), ClientError> {
        for producer in &self.producers {
            checkpoint(cancellation)?;
            tracing::debug!(resource = producer.name(), "Starting producer");
            producer
                .start(cancellation.clone())
                .await
                .inspect_err(|e| log_failure("producer", producer.name(), e))?;
        }

        for client in &self.request_reply_clients {
            checkpoint(cancellation)?;
            tracing::debug!(resource = client.name(), "Starting request-reply client");
            client
                .start(cancellation.clone())
                .await
                .inspect_err(|e| log_failure("request-reply client", client.name(), e))?;
        }

        for manager in &self.topology_managers {
            checkpoint(cancellation)?;
            tracing::debug!(resource = manager.name(), "Creating topology");
            manager
                .create_topology(cancellation.clone())
                .await
                .inspect_err(|e| log_failure("topology manager", manager.name(), e))?;
        }

        for consumer in &self.consumers {
            checkpoint(cancellation)?;
            tracing::debug!(resource = consumer.name(), "Starting consumer");
            consumer
                .start(cancellation.clone())
                .await
                .inspect_err(|e| log_failure("consumer", consumer.name(), e))?;
        }

        Ok(())
    }

    async fn stop_all(&self, cancellation: &CancellationToken) -> Result<(), ClientError> {
        for consumer in &self.consumers {
            checkpoint(cancellation)?;
            tracing::debug!(resource = consumer.name(), "Stopping consumer");
            consumer
                .stop()
                .await
                .inspect_err(|e| log_failure("consumer", consumer.name(), e))?;
        }

        for producer in &self.producers {
            checkpoint(cancellation)?;
            tracing::debug!(resource = producer.name(), "Stopping producer");
            producer
                .stop()
                .await
                .inspect_err(|e| log_failure("producer", producer.name(), e))?;
        }

        for client in &self.request_reply_clients {
            checkpoint(cancellation)?;
            tracing::debug!(resource = client.name(), "Stopping request-reply client");
            client
                .stop()
                .await
                .inspect_err(|e| log_failure("request-reply client", client.name(), e))?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for MessagingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingClient")
            .field("producers", &self.producers.len())
            .field("request_reply_clients", &self.request_reply_clients.len())
            .field("topology_managers", &self.topology_managers.len())
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

fn checkpoint(cancellation: &CancellationToken) -> Result<(), ClientError> {
    if cancellation.is_cancelled() {
        Err(ClientError::Cancelled)
    } else {
        Ok(())
    }
}

fn log_failure(kind: &'static str, resource: &str, error: &ClientError) {
    if error.is_cancelled() {
        tracing::warn!(kind, resource, "Lifecycle operation cancelled");
    } else {
        tracing::error!(kind, resource, error = %error, "Lifecycle operation failed");
    }
}

/// Builder for [`MessagingClient`].
///
/// Registration order is iteration order within each group; the order in
/// which the groups are registered relative to each other does not matter.
#[derive(Default)]
pub struct MessagingClientBuilder {
    producers: Vec<Arc<dyn Producer>>,
    request_reply_clients: Vec<Arc<dyn RequestReplyClient>>,
    topology_managers: Vec<Arc<dyn TopologyManager>>,
    consumers: Vec<Arc<dyn Consumer>>,
}

impl MessagingClientBuilder {
    /// Register a producer.
    #[must_use]
    pub fn producer(mut self, producer: Arc<dyn Producer>) -> Self {
        self.producers.push(producer);
        self
    }

    /// Register a request-reply client.
    #[must_use]
    pub fn request_reply_client(mut self, client: Arc<dyn RequestReplyClient>) -> Self {
        self.request_reply_clients.push(client);
        self
    }

    /// Register a topology manager.
    #[must_use]
    pub fn topology_manager(mut self, manager: Arc<dyn TopologyManager>) -> Self {
        self.topology_managers.push(manager);
        self
    }

    /// Register a consumer.
    #[must_use]
    pub fn consumer(mut self, consumer: Arc<dyn Consumer>) -> Self {
        self.consumers.push(consumer);
        self
    }

    /// Build the [`MessagingClient`].
    #[must_use]
    pub fn build(self) -> MessagingClient {
        MessagingClient::new(
            self.producers,
            self.request_reply_clients,
            self.topology_managers,
            self.consumers,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging_host_testing::{Journal, MockResource};

    #[test]
    fn messaging_client_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<MessagingClient>();
        assert_sync::<MessagingClient>();
    }

    #[test]
    fn builder_counts_each_group() {
        let journal = Journal::new();
        let client = MessagingClient::builder()
            .producer(Arc::new(MockResource::new("P1", &journal)))
            .producer(Arc::new(MockResource::new("P2", &journal)))
            .request_reply_client(Arc::new(MockResource::new("R1", &journal)))
            .consumer(Arc::new(MockResource::new("C1", &journal)))
            .build();

        assert_eq!(client.producer_count(), 2);
        assert_eq!(client.request_reply_client_count(), 1);
        assert_eq!(client.topology_manager_count(), 0);
        assert_eq!(client.consumer_count(), 1);
        assert!(!client.is_empty());
        assert!(journal.is_empty());
    }

    #[test]
    fn default_client_is_empty() {
        assert!(MessagingClient::default().is_empty());
    }
}
