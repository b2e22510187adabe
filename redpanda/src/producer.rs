//! Producer resource backed by an rdkafka [`FutureProducer`].

use crate::record::to_headers;
use crate::settings::RedpandaSettings;
use messaging_host_core::{CancellationToken, ClientError, LifecycleFuture, Message, Producer};
use rdkafka::producer::Producer as _;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tokio::sync::RwLock;

/// Producer publishing [`Message`]s to a single topic.
///
/// The underlying Kafka producer is created by `start` and released by
/// `stop`; [`send`](Self::send) outside that window fails with
/// [`ClientError::NotStarted`].
///
/// # Example
///
/// ```no_run
/// use messaging_host_core::{CancellationToken, Message, Producer};
/// use messaging_host_redpanda::{RedpandaProducer, RedpandaSettings};
///
/// # async fn example() -> Result<(), messaging_host_core::ClientError> {
/// let settings = RedpandaSettings::new("localhost:9092")?;
/// let producer = RedpandaProducer::new("orders", "order-events", settings);
///
/// producer.start(CancellationToken::new()).await?;
/// producer.send(&Message::new(b"placed".to_vec()).with_key("order-1")).await?;
/// producer.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct RedpandaProducer {
    name: String,
    topic: String,
    settings: RedpandaSettings,
    producer: RwLock<Option<FutureProducer>>,
}

impl RedpandaProducer {
    /// Create a producer for `topic`. Nothing connects until `start`.
    #[must_use]
    pub fn new(name: impl Into<String>, topic: impl Into<String>, settings: RedpandaSettings) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
            settings,
            producer: RwLock::new(None),
        }
    }

    /// Destination topic
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Check if `start` has completed and `stop` has not been called since
    pub async fn is_started(&self) -> bool {
        self.producer.read().await.is_some()
    }

    /// Publish `message` to the producer's topic.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotStarted`]: the producer is not started
    /// - [`ClientError::SendFailed`]: the broker did not acknowledge in time
    pub async fn send(&self, message: &Message) -> Result<(), ClientError> {
        let producer = self
            .producer
            .read()
            .await
            .clone()
            .ok_or_else(|| ClientError::NotStarted(self.name.clone()))?;

        publish(&producer, &self.topic, message, self.settings.send_timeout()).await
    }
}

impl Producer for RedpandaProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_> {
        Box::pin(async move {
            let mut slot = self.producer.write().await;
            if slot.is_some() {
                tracing::debug!(producer = %self.name, "Producer already started");
                return Ok(());
            }

            let producer = connect(&self.settings, &cancellation).await?;
            *slot = Some(producer);

            tracing::info!(producer = %self.name, topic = %self.topic, "Producer started");
            Ok(())
        })
    }

    fn stop(&self) -> LifecycleFuture<'_> {
        Box::pin(async move {
            let Some(producer) = self.producer.write().await.take() else {
                return Ok(());
            };

            flush(producer, self.settings.send_timeout()).await?;

            tracing::info!(producer = %self.name, "Producer stopped");
            Ok(())
        })
    }
}

/// Create a producer and wait until the cluster answers a metadata request.
///
/// The metadata request is blocking in librdkafka, so it runs on the
/// blocking pool while this task waits on `cancellation` as well.
pub(crate) async fn connect(
    settings: &RedpandaSettings,
    cancellation: &CancellationToken,
) -> Result<FutureProducer, ClientError> {
    if cancellation.is_cancelled() {
        return Err(ClientError::Cancelled);
    }

    let producer: FutureProducer = settings.producer_config().create().map_err(|e| {
        ClientError::ConnectionFailed(format!("Failed to create producer: {e}"))
    })?;

    let probe = producer.clone();
    let timeout = settings.metadata_timeout();
    let metadata = tokio::task::spawn_blocking(move || {
        probe
            .client()
            .fetch_metadata(None, timeout)
            .map(|metadata| metadata.brokers().len())
    });

    tokio::select! {
        () = cancellation.cancelled() => Err(ClientError::Cancelled),
        joined = metadata => match joined {
            Ok(Ok(brokers)) => {
                tracing::debug!(
                    brokers = brokers,
                    bootstrap = settings.brokers(),
                    "Connected to cluster"
                );
                Ok(producer)
            },
            Ok(Err(e)) => Err(ClientError::ConnectionFailed(format!(
                "Failed to fetch cluster metadata: {e}"
            ))),
            Err(e) => Err(ClientError::Other(format!("Metadata probe task failed: {e}"))),
        },
    }
}

/// Send one message and wait for the broker's acknowledgement.
pub(crate) async fn publish(
    producer: &FutureProducer,
    topic: &str,
    message: &Message,
    timeout: Duration,
) -> Result<(), ClientError> {
    let mut record = FutureRecord::<str, [u8]>::to(topic)
        .payload(&message.payload)
        .headers(to_headers(message));
    if let Some(key) = &message.key {
        record = record.key(key.as_str());
    }

    match producer.send(record, Timeout::After(timeout)).await {
        Ok((partition, offset)) => {
            tracing::debug!(
                topic = %topic,
                partition = partition,
                offset = offset,
                "Message published"
            );
            Ok(())
        },
        Err((kafka_error, _)) => {
            tracing::error!(topic = %topic, error = %kafka_error, "Failed to publish message");
            Err(ClientError::SendFailed {
                destination: topic.to_string(),
                reason: kafka_error.to_string(),
            })
        },
    }
}

/// Flush outstanding messages, then drop the producer.
pub(crate) async fn flush(producer: FutureProducer, timeout: Duration) -> Result<(), ClientError> {
    tokio::task::spawn_blocking(move || producer.flush(timeout))
        .await
        .map_err(|e| ClientError::Other(format!("Flush task failed: {e}")))?
        .map_err(|e| ClientError::Other(format!("Failed to flush producer: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RedpandaSettings {
        RedpandaSettings::new("localhost:9092").unwrap()
    }

    #[test]
    fn redpanda_producer_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaProducer>();
        assert_sync::<RedpandaProducer>();
    }

    #[tokio::test]
    async fn send_before_start_is_rejected() {
        let producer = RedpandaProducer::new("orders", "order-events", settings());

        let result = producer.send(&Message::new(b"x".to_vec())).await;

        assert_eq!(result, Err(ClientError::NotStarted("orders".to_string())));
        assert!(!producer.is_started().await);
    }

    #[tokio::test]
    async fn start_with_cancelled_token_never_connects() {
        let producer = RedpandaProducer::new("orders", "order-events", settings());
        let token = CancellationToken::new();
        token.cancel();

        let result = Producer::start(&producer, token).await;

        assert_eq!(result, Err(ClientError::Cancelled));
        assert!(!producer.is_started().await);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let producer = RedpandaProducer::new("orders", "order-events", settings());
        assert_eq!(Producer::stop(&producer).await, Ok(()));
    }
}
