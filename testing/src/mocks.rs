//! Recording mock resources.
//!
//! - [`Journal`]: shared, ordered log of every lifecycle call
//! - [`MockResource`]: implements all four resource traits and writes
//!   `"{name}.{operation}"` to its journal on every call
//! - [`RecordingHandler`]: message handler that keeps what it receives

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use messaging_host_core::{
    CancellationToken, ClientError, Consumer, LifecycleFuture, Message, MessageHandler, Producer,
    RequestReplyClient, TopologyManager,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A lifecycle operation a resource can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `start` on a producer, request-reply client or consumer
    Start,
    /// `stop` on a producer, request-reply client or consumer
    Stop,
    /// `create_topology` on a topology manager
    CreateTopology,
}

impl Operation {
    /// Label written to the journal
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::CreateTopology => "create_topology",
        }
    }
}

/// Shared, ordered log of lifecycle calls.
///
/// Clones share the same log, so one journal can be handed to every mock in
/// a test and inspected afterwards.
///
/// # Example
///
/// ```
/// use messaging_host_testing::Journal;
///
/// let journal = Journal::new();
/// journal.record("P1.start");
/// assert_eq!(journal.entries(), vec!["P1.start"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// Snapshot of every entry in call order
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Number of recorded entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Check if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Position of `entry` in the log, if it was recorded
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }

    /// Clear the log (for reuse across phases of a test)
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Mock resource usable as producer, request-reply client, topology manager
/// or consumer.
///
/// Every call is journaled before its outcome is decided, so a failing call
/// still shows up in the log.
///
/// # Example
///
/// ```
/// use messaging_host_core::{CancellationToken, ClientError, Producer};
/// use messaging_host_testing::{Journal, MockResource, Operation};
///
/// # async fn example() {
/// let journal = Journal::new();
/// let producer = MockResource::new("P1", &journal)
///     .failing(Operation::Start, ClientError::ConnectionFailed("refused".into()));
///
/// let result = Producer::start(&producer, CancellationToken::new()).await;
/// assert!(result.is_err());
/// assert_eq!(journal.entries(), vec!["P1.start"]);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MockResource {
    name: String,
    journal: Journal,
    failures: HashMap<Operation, ClientError>,
    cancels: HashMap<Operation, CancellationToken>,
    wait_for_cancellation: bool,
    cancellations_observed: Arc<AtomicUsize>,
}

impl MockResource {
    /// Create a mock that succeeds on every call
    #[must_use]
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            failures: HashMap::new(),
            cancels: HashMap::new(),
            wait_for_cancellation: false,
            cancellations_observed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail `operation` with `error`
    #[must_use]
    pub fn failing(mut self, operation: Operation, error: ClientError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Cancel `token` when `operation` is invoked, after journaling the call
    #[must_use]
    pub fn cancelling(mut self, operation: Operation, token: CancellationToken) -> Self {
        self.cancels.insert(operation, token);
        self
    }

    /// Make cancellable calls suspend until their token is cancelled, then
    /// fail with [`ClientError::Cancelled`]
    #[must_use]
    pub const fn waiting_for_cancellation(mut self) -> Self {
        self.wait_for_cancellation = true;
        self
    }

    /// Resource name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of suspended calls that saw their token fire
    #[must_use]
    pub fn cancellations_observed(&self) -> usize {
        self.cancellations_observed.load(Ordering::SeqCst)
    }

    fn invoke(
        &self,
        operation: Operation,
        cancellation: Option<CancellationToken>,
    ) -> LifecycleFuture<'_> {
        self.journal
            .record(format!("{}.{}", self.name, operation.label()));
        if let Some(token) = self.cancels.get(&operation) {
            token.cancel();
        }
        let failure = self.failures.get(&operation).cloned();
        let wait = self.wait_for_cancellation;
        let observed = Arc::clone(&self.cancellations_observed);

        Box::pin(async move {
            if let (true, Some(token)) = (wait, cancellation) {
                token.cancelled().await;
                observed.fetch_add(1, Ordering::SeqCst);
                return Err(ClientError::Cancelled);
            }
            failure.map_or(Ok(()), Err)
        })
    }
}

impl Producer for MockResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_> {
        self.invoke(Operation::Start, Some(cancellation))
    }

    fn stop(&self) -> LifecycleFuture<'_> {
        self.invoke(Operation::Stop, None)
    }
}

impl RequestReplyClient for MockResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_> {
        self.invoke(Operation::Start, Some(cancellation))
    }

    fn stop(&self) -> LifecycleFuture<'_> {
        self.invoke(Operation::Stop, None)
    }
}

impl TopologyManager for MockResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_topology(&self, cancellation: CancellationToken) -> LifecycleFuture<'_> {
        self.invoke(Operation::CreateTopology, Some(cancellation))
    }
}

impl Consumer for MockResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, cancellation: CancellationToken) -> LifecycleFuture<'_> {
        self.invoke(Operation::Start, Some(cancellation))
    }

    fn stop(&self) -> LifecycleFuture<'_> {
        self.invoke(Operation::Stop, None)
    }
}

/// Message handler that keeps every message it is given.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl RecordingHandler {
    /// Create an empty handler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of received messages in arrival order
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    /// Number of received messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Check if nothing was received
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().unwrap().is_empty()
    }
}

impl MessageHandler for RecordingHandler {
    fn handle(&self, message: Message) -> LifecycleFuture<'_> {
        self.messages.lock().unwrap().push(message);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_every_operation_with_its_label() {
        let journal = Journal::new();
        let resource = MockResource::new("X", &journal);

        Producer::start(&resource, CancellationToken::new()).await.unwrap();
        TopologyManager::create_topology(&resource, CancellationToken::new())
            .await
            .unwrap();
        Consumer::stop(&resource).await.unwrap();

        assert_eq!(
            journal.entries(),
            vec!["X.start", "X.create_topology", "X.stop"]
        );
    }

    #[tokio::test]
    async fn failure_applies_to_one_operation_only() {
        let journal = Journal::new();
        let resource = MockResource::new("X", &journal)
            .failing(Operation::Stop, ClientError::Other("stuck".to_string()));

        assert!(Producer::start(&resource, CancellationToken::new()).await.is_ok());
        assert_eq!(
            Producer::stop(&resource).await,
            Err(ClientError::Other("stuck".to_string()))
        );
    }

    #[tokio::test]
    async fn waiting_resource_returns_cancelled_once_token_fires() {
        let journal = Journal::new();
        let resource = MockResource::new("X", &journal).waiting_for_cancellation();
        let token = CancellationToken::new();

        let pending = Consumer::start(&resource, token.clone());
        token.cancel();

        assert_eq!(pending.await, Err(ClientError::Cancelled));
        assert_eq!(resource.cancellations_observed(), 1);
    }

    #[tokio::test]
    async fn cancelling_resource_fires_token_when_called() {
        let journal = Journal::new();
        let token = CancellationToken::new();
        let resource = MockResource::new("C1", &journal).cancelling(Operation::Stop, token.clone());

        assert!(Consumer::start(&resource, CancellationToken::new()).await.is_ok());
        assert!(!token.is_cancelled());
        assert!(Consumer::stop(&resource).await.is_ok());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn recording_handler_keeps_messages() {
        let handler = RecordingHandler::new();
        handler.handle(Message::new(b"a".to_vec())).await.unwrap();
        handler.handle(Message::new(b"b".to_vec())).await.unwrap();

        let payloads: Vec<Vec<u8>> = handler.messages().into_iter().map(|m| m.payload).collect();
        assert_eq!(payloads, vec![b"a".to_vec(), b"b".to_vec()]);
    }
}
