//! Consumer resource dispatching records to a [`MessageHandler`].
//!
//! # Delivery Semantics
//!
//! **At-least-once delivery** with manual offset commits:
//! - A record's offset is committed AFTER the handler returns
//! - If the process stops before the commit, the record is redelivered
//! - Handlers MUST be idempotent
//! - A handler error is logged and the record is still committed, so one
//!   poison message cannot stall the partition

use crate::record::from_record;
use crate::settings::RedpandaSettings;
use messaging_host_core::{
    CancellationToken, ClientError, Consumer, LifecycleFuture, MessageHandler,
};
use rdkafka::consumer::{CommitMode, Consumer as _, StreamConsumer};
use rdkafka::message::Message as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// How often [`await_assignment`] checks the group assignment
const ASSIGNMENT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Background dispatch loop owned by a started consumer.
pub(crate) struct Dispatcher {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Dispatcher {
    /// Signal the loop to exit and wait for it.
    pub(crate) async fn shutdown(self) -> Result<(), ClientError> {
        self.shutdown.cancel();
        self.task
            .await
            .map_err(|e| ClientError::Other(format!("Consumer task failed: {e}")))
    }
}

/// Consumer subscribing one consumer group to one topic.
///
/// # Example
///
/// ```no_run
/// use messaging_host_core::{CancellationToken, ClientError, Consumer, Message};
/// use messaging_host_redpanda::{RedpandaConsumer, RedpandaSettings};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), ClientError> {
/// let settings = RedpandaSettings::new("localhost:9092")?;
/// let consumer = RedpandaConsumer::new(
///     "order-projection",
///     "order-events",
///     "order-projection",
///     settings,
///     Arc::new(|message: Message| async move {
///         println!("received {} bytes", message.payload.len());
///         Ok::<(), ClientError>(())
///     }),
/// );
///
/// consumer.start(CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct RedpandaConsumer {
    name: String,
    topic: String,
    group_id: String,
    settings: RedpandaSettings,
    handler: Arc<dyn MessageHandler>,
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl RedpandaConsumer {
    /// Create a consumer. Nothing connects until `start`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        topic: impl Into<String>,
        group_id: impl Into<String>,
        settings: RedpandaSettings,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
            group_id: group_id.into(),
            settings,
            handler,
            dispatcher: Mutex::new(None),
        }
    }

    /// Subscribed topic
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Consumer group id
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Check if the dispatch loop is running
    pub async fn is_started(&self) -> bool {
        self.dispatcher.lock().await.is_some()
    }
}

impl Consumer for RedpandaConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_> {
        Box::pin(async move {
            if cancellation.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            let mut slot = self.dispatcher.lock().await;
            if slot.is_some() {
                tracing::debug!(consumer = %self.name, "Consumer already started");
                return Ok(());
            }

            let consumer = Arc::new(subscribe(&self.settings, &self.group_id, &self.topic)?);
            *slot = Some(spawn_dispatch(
                self.name.clone(),
                consumer,
                Arc::clone(&self.handler),
            ));

            tracing::info!(
                consumer = %self.name,
                topic = %self.topic,
                consumer_group = %self.group_id,
                "Consumer started"
            );
            Ok(())
        })
    }

    fn stop(&self) -> LifecycleFuture<'_> {
        Box::pin(async move {
            let Some(dispatcher) = self.dispatcher.lock().await.take() else {
                return Ok(());
            };

            dispatcher.shutdown().await?;

            tracing::info!(consumer = %self.name, "Consumer stopped");
            Ok(())
        })
    }
}

/// Create a stream consumer for `group_id` subscribed to `topic`.
pub(crate) fn subscribe(
    settings: &RedpandaSettings,
    group_id: &str,
    topic: &str,
) -> Result<StreamConsumer, ClientError> {
    let consumer: StreamConsumer = settings.consumer_config(group_id).create().map_err(|e| {
        ClientError::ConnectionFailed(format!("Failed to create consumer: {e}"))
    })?;

    consumer.subscribe(&[topic]).map_err(|e| {
        ClientError::ConnectionFailed(format!("Failed to subscribe to '{topic}': {e}"))
    })?;

    Ok(consumer)
}

/// Wait until the group coordinator has assigned `consumer` at least one
/// partition.
///
/// Group joins are driven by the dispatch loop polling the consumer, so the
/// loop must already be running.
pub(crate) async fn await_assignment(
    consumer: &StreamConsumer,
    limit: Duration,
    cancellation: &CancellationToken,
) -> Result<(), ClientError> {
    let assigned = async {
        loop {
            match consumer.assignment() {
                Ok(partitions) if partitions.count() > 0 => return,
                Ok(_) => {},
                Err(e) => tracing::trace!(error = %e, "Assignment not available yet"),
            }
            tokio::time::sleep(ASSIGNMENT_POLL_INTERVAL).await;
        }
    };

    tokio::select! {
        () = cancellation.cancelled() => Err(ClientError::Cancelled),
        assignment = tokio::time::timeout(limit, assigned) => assignment.map_err(|_| {
            ClientError::ConnectionFailed(format!(
                "No partitions assigned within {}ms",
                limit.as_millis()
            ))
        }),
    }
}

/// Spawn the loop that feeds every record of `consumer` to `handler`.
pub(crate) fn spawn_dispatch(
    name: String,
    consumer: Arc<StreamConsumer>,
    handler: Arc<dyn MessageHandler>,
) -> Dispatcher {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                received = consumer.recv() => match received {
                    Ok(record) => {
                        tracing::trace!(
                            consumer = %name,
                            topic = record.topic(),
                            partition = record.partition(),
                            offset = record.offset(),
                            "Received message"
                        );

                        if let Err(e) = handler.handle(from_record(&record)).await {
                            tracing::error!(
                                consumer = %name,
                                topic = record.topic(),
                                offset = record.offset(),
                                error = %e,
                                "Message handler failed"
                            );
                        }

                        // Commit only after the handler has seen the record
                        if let Err(e) = consumer.commit_message(&record, CommitMode::Async) {
                            tracing::warn!(
                                consumer = %name,
                                topic = record.topic(),
                                partition = record.partition(),
                                offset = record.offset(),
                                error = %e,
                                "Failed to commit offset (message may be redelivered)"
                            );
                        }
                    },
                    Err(e) => {
                        tracing::warn!(consumer = %name, error = %e, "Failed to receive message");
                    },
                },
            }
        }

        consumer.unsubscribe();
        tracing::debug!(consumer = %name, "Consumer task exiting");
    });

    Dispatcher { shutdown, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging_host_core::Message;

    fn consumer() -> RedpandaConsumer {
        RedpandaConsumer::new(
            "projection",
            "order-events",
            "order-projection",
            RedpandaSettings::new("localhost:9092").unwrap(),
            Arc::new(|_message: Message| async { Ok::<(), ClientError>(()) }),
        )
    }

    #[test]
    fn redpanda_consumer_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaConsumer>();
        assert_sync::<RedpandaConsumer>();
    }

    #[tokio::test]
    async fn start_with_cancelled_token_does_not_subscribe() {
        let consumer = consumer();
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(Consumer::start(&consumer, token).await, Err(ClientError::Cancelled));
        assert!(!consumer.is_started().await);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let consumer = consumer();

        assert_eq!(Consumer::stop(&consumer).await, Ok(()));
        assert_eq!(consumer.topic(), "order-events");
        assert_eq!(consumer.group_id(), "order-projection");
    }
}
