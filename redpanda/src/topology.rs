//! Topology manager declaring topics through the admin API.

use crate::settings::RedpandaSettings;
use messaging_host_core::{CancellationToken, ClientError, LifecycleFuture, TopologyManager};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;

/// Declaration of a single topic.
///
/// # Example
///
/// ```
/// use messaging_host_redpanda::TopicSpec;
///
/// let orders = TopicSpec::new("order-events")
///     .partitions(6)
///     .replication(3)
///     .config("retention.ms", "604800000");
///
/// assert_eq!(orders.name(), "order-events");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    name: String,
    partitions: i32,
    replication: i32,
    config: Vec<(String, String)>,
}

impl TopicSpec {
    /// Topic with one partition and replication factor one
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: 1,
            replication: 1,
            config: Vec::new(),
        }
    }

    /// Set the partition count
    #[must_use]
    pub const fn partitions(mut self, partitions: i32) -> Self {
        self.partitions = partitions;
        self
    }

    /// Set the replication factor
    #[must_use]
    pub const fn replication(mut self, replication: i32) -> Self {
        self.replication = replication;
        self
    }

    /// Add a topic-level config entry
    #[must_use]
    pub fn config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.push((key.into(), value.into()));
        self
    }

    /// Topic name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ClientError> {
        let reason = if self.name.trim().is_empty() {
            "topic name is empty"
        } else if self.partitions < 1 {
            "partition count must be at least 1"
        } else if self.replication < 1 {
            "replication factor must be at least 1"
        } else {
            return Ok(());
        };

        Err(ClientError::TopologyFailed {
            destination: self.name.clone(),
            reason: reason.to_string(),
        })
    }

    fn as_new_topic(&self) -> NewTopic<'_> {
        self.config.iter().fold(
            NewTopic::new(
                &self.name,
                self.partitions,
                TopicReplication::Fixed(self.replication),
            ),
            |topic, (key, value)| topic.set(key, value),
        )
    }
}

/// Topology manager creating a fixed set of topics.
///
/// Creation is declarative: a topic that already exists is left alone and
/// counts as success, so every instance of a service can declare the same
/// topology at startup.
pub struct RedpandaTopologyManager {
    name: String,
    settings: RedpandaSettings,
    topics: Vec<TopicSpec>,
}

impl RedpandaTopologyManager {
    /// Create a manager declaring `topics`.
    #[must_use]
    pub fn new(name: impl Into<String>, settings: RedpandaSettings, topics: Vec<TopicSpec>) -> Self {
        Self {
            name: name.into(),
            settings,
            topics,
        }
    }

    /// Declared topics
    #[must_use]
    pub fn topics(&self) -> &[TopicSpec] {
        &self.topics
    }

    async fn declare(&self) -> Result<(), ClientError> {
        for spec in &self.topics {
            spec.validate()?;
        }

        let admin: AdminClient<DefaultClientContext> =
            self.settings.base_config().create().map_err(|e| {
                ClientError::ConnectionFailed(format!("Failed to create admin client: {e}"))
            })?;

        let new_topics: Vec<NewTopic<'_>> = self.topics.iter().map(TopicSpec::as_new_topic).collect();
        let options = AdminOptions::new().operation_timeout(Some(self.settings.metadata_timeout()));

        let results = admin
            .create_topics(&new_topics, &options)
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("Failed to create topics: {e}")))?;

        for result in results {
            match result {
                Ok(topic) => {
                    tracing::info!(manager = %self.name, topic = %topic, "Topic created");
                },
                Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    tracing::debug!(manager = %self.name, topic = %topic, "Topic already exists");
                },
                Err((topic, code)) => {
                    return Err(ClientError::TopologyFailed {
                        destination: topic,
                        reason: code.to_string(),
                    });
                },
            }
        }

        Ok(())
    }
}

impl TopologyManager for RedpandaTopologyManager {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_topology(&self, cancellation: CancellationToken) -> LifecycleFuture<'_> {
        Box::pin(async move {
            if cancellation.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            if self.topics.is_empty() {
                return Ok(());
            }

            tokio::select! {
                () = cancellation.cancelled() => Err(ClientError::Cancelled),
                result = self.declare() => result,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RedpandaSettings {
        RedpandaSettings::new("localhost:9092").unwrap()
    }

    #[test]
    fn invalid_specs_are_rejected_with_their_name() {
        let no_partitions = TopicSpec::new("orders").partitions(0);
        assert_eq!(
            no_partitions.validate(),
            Err(ClientError::TopologyFailed {
                destination: "orders".to_string(),
                reason: "partition count must be at least 1".to_string(),
            })
        );

        assert!(TopicSpec::new(" ").validate().is_err());
        assert!(TopicSpec::new("orders").replication(0).validate().is_err());
        assert!(TopicSpec::new("orders").partitions(3).validate().is_ok());
    }

    #[tokio::test]
    async fn empty_topology_succeeds_without_a_broker() {
        let manager = RedpandaTopologyManager::new("none", settings(), Vec::new());
        assert_eq!(manager.create_topology(CancellationToken::new()).await, Ok(()));
    }

    #[tokio::test]
    async fn invalid_spec_fails_before_contacting_the_broker() {
        let manager = RedpandaTopologyManager::new(
            "orders",
            settings(),
            vec![TopicSpec::new("order-events").replication(0)],
        );

        let result = manager.create_topology(CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(ClientError::TopologyFailed { destination, .. }) if destination == "order-events"
        ));
    }

    #[tokio::test]
    async fn cancelled_token_skips_declaration() {
        let manager = RedpandaTopologyManager::new(
            "orders",
            settings(),
            vec![TopicSpec::new("order-events")],
        );
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(manager.create_topology(token).await, Err(ClientError::Cancelled));
    }
}
