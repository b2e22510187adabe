//! Correlated request/response over two topics.
//!
//! ```text
//! request(msg) ──► request topic ──► responder
//!                   correlation-id, reply-to
//!     ▲                                 │
//!     │                                 ▼
//! pending[id] ◄── reply listener ◄── reply topic
//! ```
//!
//! Each client instance listens on the reply topic with its own consumer
//! group, so every instance sees every reply and keeps the ones whose
//! correlation id it is waiting for. `start` returns only once that group
//! has been assigned the reply topic's partitions.

use crate::consumer::{Dispatcher, await_assignment, spawn_dispatch, subscribe};
use crate::producer::{connect, flush, publish};
use crate::settings::RedpandaSettings;
use messaging_host_core::{
    CancellationToken, ClientError, LifecycleFuture, Message, MessageHandler, RequestReplyClient,
};
use rdkafka::producer::FutureProducer;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use uuid::Uuid;

type PendingReplies = Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>;

/// Routes replies to the request waiting for them.
struct ReplyRouter {
    client: String,
    pending: PendingReplies,
}

impl MessageHandler for ReplyRouter {
    fn handle(&self, message: Message) -> LifecycleFuture<'_> {
        Box::pin(async move {
            let Some(correlation_id) = message.correlation_id.clone() else {
                tracing::debug!(client = %self.client, "Ignoring reply without correlation id");
                return Ok(());
            };

            let waiter = self.pending.lock().await.remove(&correlation_id);
            match waiter {
                Some(sender) => {
                    if sender.send(message).is_err() {
                        tracing::debug!(
                            client = %self.client,
                            correlation_id = %correlation_id,
                            "Requester gave up before the reply arrived"
                        );
                    }
                },
                None => {
                    tracing::trace!(
                        client = %self.client,
                        correlation_id = %correlation_id,
                        "Reply for another instance or an expired request"
                    );
                },
            }
            Ok(())
        })
    }
}

struct Running {
    producer: FutureProducer,
    listener: Dispatcher,
}

/// Request-reply client sending to one topic and listening on another.
///
/// # Example
///
/// ```no_run
/// use messaging_host_core::{CancellationToken, Message, RequestReplyClient};
/// use messaging_host_redpanda::{RedpandaRequestReplyClient, RedpandaSettings};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), messaging_host_core::ClientError> {
/// let settings = RedpandaSettings::new("localhost:9092")?;
/// let pricing = RedpandaRequestReplyClient::new("pricing", "price-requests", "price-replies", settings);
///
/// pricing.start(CancellationToken::new()).await?;
/// let reply = pricing
///     .request(Message::new(b"sku-42".to_vec()), Duration::from_secs(5))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct RedpandaRequestReplyClient {
    name: String,
    request_topic: String,
    reply_topic: String,
    settings: RedpandaSettings,
    pending: PendingReplies,
    running: Mutex<Option<Running>>,
}

impl RedpandaRequestReplyClient {
    /// Create a client. Nothing connects until `start`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        request_topic: impl Into<String>,
        reply_topic: impl Into<String>,
        settings: RedpandaSettings,
    ) -> Self {
        Self {
            name: name.into(),
            request_topic: request_topic.into(),
            reply_topic: reply_topic.into(),
            settings,
            pending: Arc::new(Mutex::new(HashMap::new())),
            running: Mutex::new(None),
        }
    }

    /// Topic requests are sent to
    #[must_use]
    pub fn request_topic(&self) -> &str {
        &self.request_topic
    }

    /// Topic replies are read from
    #[must_use]
    pub fn reply_topic(&self) -> &str {
        &self.reply_topic
    }

    /// Number of requests still waiting for a reply
    pub async fn pending_requests(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Send `message` and wait up to `timeout` for the correlated reply.
    ///
    /// A fresh correlation id and this client's reply topic overwrite
    /// whatever the message carried.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotStarted`]: the client is not started, or was
    ///   stopped while waiting
    /// - [`ClientError::SendFailed`]: the request could not be published
    /// - [`ClientError::RequestTimedOut`]: no reply within `timeout`
    pub async fn request(&self, message: Message, timeout: Duration) -> Result<Message, ClientError> {
        let producer = self
            .running
            .lock()
            .await
            .as_ref()
            .map(|running| running.producer.clone())
            .ok_or_else(|| ClientError::NotStarted(self.name.clone()))?;

        let correlation_id = Uuid::new_v4().to_string();
        let message = message
            .with_correlation_id(correlation_id.clone())
            .with_reply_to(self.reply_topic.clone());

        let (sender, receiver) = oneshot::channel();
        self.pending
            .lock()
            .await
            .insert(correlation_id.clone(), sender);

        if let Err(e) = publish(
            &producer,
            &self.request_topic,
            &message,
            self.settings.send_timeout(),
        )
        .await
        {
            self.pending.lock().await.remove(&correlation_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ClientError::NotStarted(self.name.clone())),
            Err(_) => {
                self.pending.lock().await.remove(&correlation_id);
                tracing::warn!(
                    client = %self.name,
                    correlation_id = %correlation_id,
                    timeout_ms = timeout.as_millis(),
                    "Request timed out"
                );
                Err(ClientError::RequestTimedOut { correlation_id })
            },
        }
    }

    fn reply_group_id(&self) -> String {
        format!("{}-{}-replies-{}", self.settings.client_id(), self.name, Uuid::new_v4())
    }
}

impl RequestReplyClient for RedpandaRequestReplyClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_> {
        Box::pin(async move {
            let mut slot = self.running.lock().await;
            if slot.is_some() {
                tracing::debug!(client = %self.name, "Request-reply client already started");
                return Ok(());
            }

            let producer = connect(&self.settings, &cancellation).await?;

            if cancellation.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            let group_id = self.reply_group_id();
            let consumer = Arc::new(subscribe(&self.settings, &group_id, &self.reply_topic)?);
            let router = Arc::new(ReplyRouter {
                client: self.name.clone(),
                pending: Arc::clone(&self.pending),
            });
            let listener = spawn_dispatch(
                format!("{}-replies", self.name),
                Arc::clone(&consumer),
                router,
            );

            // A fresh group starts reading at the log end once assigned, so
            // replies written before the assignment would never be seen.
            let assignment =
                await_assignment(&consumer, self.settings.metadata_timeout(), &cancellation).await;
            if let Err(e) = assignment {
                if let Err(shutdown) = listener.shutdown().await {
                    tracing::warn!(client = %self.name, error = %shutdown, "Failed to stop reply listener");
                }
                return Err(e);
            }

            *slot = Some(Running { producer, listener });

            tracing::info!(
                client = %self.name,
                request_topic = %self.request_topic,
                reply_topic = %self.reply_topic,
                consumer_group = %group_id,
                "Request-reply client started"
            );
            Ok(())
        })
    }

    fn stop(&self) -> LifecycleFuture<'_> {
        Box::pin(async move {
            let Some(running) = self.running.lock().await.take() else {
                return Ok(());
            };

            running.listener.shutdown().await?;

            // Dropping the senders fails every request still waiting
            let abandoned = {
                let mut pending = self.pending.lock().await;
                let count = pending.len();
                pending.clear();
                count
            };
            if abandoned > 0 {
                tracing::warn!(client = %self.name, abandoned, "Abandoned pending requests");
            }

            flush(running.producer, self.settings.send_timeout()).await?;

            tracing::info!(client = %self.name, "Request-reply client stopped");
            Ok(())
        })
    }
}
