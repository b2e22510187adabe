//! Integration tests for the Redpanda resources with a real Kafka instance.
//!
//! These tests use testcontainers to spin up Kafka and validate:
//! - Topology declaration (including re-declaring existing topics)
//! - Producer to consumer delivery through a hosted `MessagingClient`
//! - Request/reply correlation
//!
//! # Running These Tests
//!
//! These tests are marked as `#[ignore]` by default because they:
//! - Require Docker to be running (for testcontainers)
//! - Take 15-60 seconds per test to spin up Kafka
//! - Can be flaky due to Kafka's distributed nature and timing
//!
//! To run explicitly:
//! ```bash
//! cargo test -p messaging-host-redpanda --test integration_tests -- --ignored
//! ```

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use messaging_host_core::{CancellationToken, ClientError, Message, Producer, TopologyManager};
use messaging_host_redpanda::{
    RedpandaConsumer, RedpandaProducer, RedpandaRequestReplyClient, RedpandaSettings,
    RedpandaTopologyManager, TopicSpec,
};
use messaging_host_runtime::MessagingClient;
use messaging_host_testing::{RecordingHandler, init_test_tracing};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::kafka::{KAFKA_PORT, Kafka};

/// Start Kafka and return the container with its bootstrap address
async fn start_kafka() -> (ContainerAsync<Kafka>, String) {
    let kafka = Kafka::default()
        .with_env_var("KAFKA_AUTO_CREATE_TOPICS_ENABLE", "false")
        .start()
        .await
        .expect("Failed to start Kafka container");

    let host = kafka.get_host().await.expect("Failed to get host");
    let port = kafka
        .get_host_port_ipv4(KAFKA_PORT)
        .await
        .expect("Failed to get port");
    let brokers = format!("{host}:{port}");

    wait_for_kafka_ready(&brokers).await;
    (kafka, brokers)
}

/// Helper to wait for Kafka to answer metadata requests
async fn wait_for_kafka_ready(brokers: &str) {
    let settings = settings(brokers);
    let max_attempts = 60;
    for attempt in 1..=max_attempts {
        let probe = RedpandaProducer::new("probe", "unused", settings.clone());
        if probe.start(CancellationToken::new()).await.is_ok() {
            probe.stop().await.expect("Failed to stop probe");
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(
            attempt != max_attempts,
            "Kafka failed to become ready after {max_attempts} attempts"
        );
    }
}

fn settings(brokers: &str) -> RedpandaSettings {
    RedpandaSettings::builder()
        .brokers(brokers)
        .client_id("integration-tests")
        .auto_offset_reset("earliest") // Read from beginning for testing
        .metadata_timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build settings")
}

/// Wait until `condition` holds or fail after `timeout`
async fn eventually(timeout: Duration, condition: impl Fn() -> bool) {
    tokio::time::timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .expect("Condition not met before timeout");
}

#[tokio::test]
#[ignore]
async fn test_topology_declaration_is_idempotent() {
    init_test_tracing();
    let (_kafka, brokers) = start_kafka().await;

    let manager = RedpandaTopologyManager::new(
        "orders",
        settings(&brokers),
        vec![
            TopicSpec::new("declared-events").partitions(3),
            TopicSpec::new("declared-audit").config("retention.ms", "60000"),
        ],
    );

    manager
        .create_topology(CancellationToken::new())
        .await
        .expect("First declaration failed");
    manager
        .create_topology(CancellationToken::new())
        .await
        .expect("Re-declaring existing topics must succeed");
}

#[tokio::test]
#[ignore]
async fn test_hosted_client_delivers_from_producer_to_consumer() {
    init_test_tracing();
    let (_kafka, brokers) = start_kafka().await;
    let settings = settings(&brokers);

    let producer = Arc::new(RedpandaProducer::new(
        "orders",
        "order-events",
        settings.clone(),
    ));
    let handler = RecordingHandler::new();
    let consumer = Arc::new(RedpandaConsumer::new(
        "audit",
        "order-events",
        "audit-group",
        settings.clone(),
        Arc::new(handler.clone()),
    ));
    let topology = Arc::new(RedpandaTopologyManager::new(
        "orders",
        settings,
        vec![TopicSpec::new("order-events")],
    ));

    let client = MessagingClient::builder()
        .producer(producer.clone())
        .topology_manager(topology)
        .consumer(consumer.clone())
        .build();

    client
        .start(CancellationToken::new())
        .await
        .expect("Failed to start client");
    assert!(producer.is_started().await);
    assert!(consumer.is_started().await);

    producer
        .send(
            &Message::new(vec![1, 2, 3])
                .with_key("order-1")
                .with_header("tenant", "acme"),
        )
        .await
        .expect("Failed to send");

    eventually(Duration::from_secs(20), || handler.len() == 1).await;

    let received = handler.messages().remove(0);
    assert_eq!(received.payload, vec![1, 2, 3]);
    assert_eq!(received.key.as_deref(), Some("order-1"));
    assert_eq!(received.header("tenant"), Some(&b"acme"[..]));

    client
        .stop(CancellationToken::new())
        .await
        .expect("Failed to stop client");
    assert!(!producer.is_started().await);
    assert!(!consumer.is_started().await);
    assert_eq!(
        producer.send(&Message::new(Vec::new())).await,
        Err(ClientError::NotStarted("orders".to_string()))
    );
}

#[tokio::test]
#[ignore]
async fn test_request_reply_round_trip() {
    init_test_tracing();
    let (_kafka, brokers) = start_kafka().await;
    let settings = settings(&brokers);

    // Responder: consume requests, answer on the reply-to topic
    let replier = Arc::new(RedpandaProducer::new(
        "replier",
        "price-replies",
        settings.clone(),
    ));
    let responder_output = Arc::clone(&replier);
    let responder = Arc::new(RedpandaConsumer::new(
        "pricing-service",
        "price-requests",
        "pricing-service",
        settings.clone(),
        Arc::new(move |request: Message| {
            let replier = Arc::clone(&responder_output);
            async move {
                let mut answer = request.payload.clone();
                answer.extend_from_slice(b":42");
                replier.send(&request.reply(answer)).await
            }
        }),
    ));

    let pricing = Arc::new(RedpandaRequestReplyClient::new(
        "pricing",
        "price-requests",
        "price-replies",
        settings.clone(),
    ));
    let topology = Arc::new(RedpandaTopologyManager::new(
        "pricing",
        settings,
        vec![
            TopicSpec::new("price-requests"),
            TopicSpec::new("price-replies"),
        ],
    ));

    // The reply listener subscribes before the topology step runs; with
    // auto-creation disabled the reply topic has to exist up front.
    topology
        .create_topology(CancellationToken::new())
        .await
        .expect("Failed to declare topics");

    let client = MessagingClient::builder()
        .producer(replier)
        .request_reply_client(pricing.clone())
        .topology_manager(topology)
        .consumer(responder)
        .build();
    client
        .start(CancellationToken::new())
        .await
        .expect("Failed to start client");

    let reply = pricing
        .request(Message::new(b"sku-7".to_vec()), Duration::from_secs(30))
        .await
        .expect("No reply received");

    assert_eq!(reply.payload, b"sku-7:42");
    assert!(reply.correlation_id.is_some());
    assert_eq!(pricing.pending_requests().await, 0);

    client
        .stop(CancellationToken::new())
        .await
        .expect("Failed to stop client");
}

#[tokio::test]
#[ignore]
async fn test_request_reply_right_after_start_with_latest_offsets() {
    init_test_tracing();
    let (_kafka, brokers) = start_kafka().await;
    let responder_settings = settings(&brokers);
    // Default offset reset is "latest": replies only arrive if the listener
    // was assigned its partitions before start returned.
    let requester_settings = RedpandaSettings::new(&brokers).expect("Failed to build settings");

    let topology = RedpandaTopologyManager::new(
        "quotes",
        responder_settings.clone(),
        vec![
            TopicSpec::new("quote-requests"),
            TopicSpec::new("quote-replies"),
        ],
    );
    topology
        .create_topology(CancellationToken::new())
        .await
        .expect("Failed to declare topics");

    let replier = Arc::new(RedpandaProducer::new(
        "quote-replier",
        "quote-replies",
        responder_settings.clone(),
    ));
    let responder_output = Arc::clone(&replier);
    let responder = Arc::new(RedpandaConsumer::new(
        "quote-service",
        "quote-requests",
        "quote-service",
        responder_settings,
        Arc::new(move |request: Message| {
            let replier = Arc::clone(&responder_output);
            async move { replier.send(&request.reply(b"ok".to_vec())).await }
        }),
    ));
    let quotes = Arc::new(RedpandaRequestReplyClient::new(
        "quotes",
        "quote-requests",
        "quote-replies",
        requester_settings,
    ));

    let client = MessagingClient::builder()
        .producer(replier)
        .request_reply_client(quotes.clone())
        .consumer(responder)
        .build();
    client
        .start(CancellationToken::new())
        .await
        .expect("Failed to start client");

    let reply = quotes
        .request(Message::new(b"quote".to_vec()), Duration::from_secs(30))
        .await
        .expect("Reply written after start must be received");
    assert_eq!(reply.payload, b"ok");

    client
        .stop(CancellationToken::new())
        .await
        .expect("Failed to stop client");
}
