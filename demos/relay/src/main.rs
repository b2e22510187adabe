//! Relay demo binary
//!
//! Hosts a small messaging client against a Redpanda cluster:
//! - declares `orders`, `price-requests` and `price-replies`
//! - publishes an order every few seconds and logs it from a consumer
//! - answers price requests and asks for a price with every order
//!
//! Configuration comes from `REDPANDA_BROKERS`, `REDPANDA_CLIENT_ID`,
//! `MESSAGING_START_TIMEOUT_SECS` and `MESSAGING_SHUTDOWN_TIMEOUT_SECS`.
//! Stop with Ctrl-C.

use anyhow::Context;
use messaging_host_core::{CancellationToken, ClientError, Message, TopologyManager};
use messaging_host_redpanda::{
    RedpandaConsumer, RedpandaProducer, RedpandaRequestReplyClient, RedpandaSettings,
    RedpandaTopologyManager, TopicSpec,
};
use messaging_host_runtime::{HostConfig, MessagingClient, MessagingHost};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Serialize, Deserialize)]
struct OrderPlaced {
    order_id: u64,
    sku: String,
}

const DEFAULT_LOG_FILTER: &str =
    "relay=debug,messaging_host_runtime=debug,messaging_host_redpanda=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = RedpandaSettings::from_env().context("REDPANDA_BROKERS must be set")?;
    let config = HostConfig::from_env();
    tracing::info!(
        brokers = settings.brokers(),
        shutdown_timeout_secs = config.shutdown_timeout.as_secs(),
        "Starting relay"
    );

    let topology = Arc::new(RedpandaTopologyManager::new(
        "relay",
        settings.clone(),
        vec![
            TopicSpec::new("orders").partitions(3),
            TopicSpec::new("price-requests"),
            TopicSpec::new("price-replies"),
        ],
    ));

    // Request-reply clients start before topology is declared, and the
    // pricing client waits for its reply topic to be assigned.
    topology
        .create_topology(CancellationToken::new())
        .await
        .context("failed to declare topics")?;

    let orders = Arc::new(RedpandaProducer::new("orders", "orders", settings.clone()));
    let replies = Arc::new(RedpandaProducer::new(
        "price-replies",
        "price-replies",
        settings.clone(),
    ));
    let pricing = Arc::new(RedpandaRequestReplyClient::new(
        "pricing",
        "price-requests",
        "price-replies",
        settings.clone(),
    ));

    let order_log = Arc::new(RedpandaConsumer::new(
        "order-log",
        "orders",
        "relay-order-log",
        settings.clone(),
        Arc::new(|message: Message| async move {
            let order: OrderPlaced = message.decode()?;
            tracing::info!(order_id = order.order_id, sku = %order.sku, "Order received");
            Ok::<(), ClientError>(())
        }),
    ));

    let responder_output = Arc::clone(&replies);
    let price_service = Arc::new(RedpandaConsumer::new(
        "price-service",
        "price-requests",
        "relay-price-service",
        settings,
        Arc::new(move |request: Message| {
            let replies = Arc::clone(&responder_output);
            async move {
                let sku = String::from_utf8_lossy(&request.payload).into_owned();
                let price = format!("{sku}=9.99");
                replies.send(&request.reply(price.into_bytes())).await
            }
        }),
    ));

    let client = MessagingClient::builder()
        .producer(orders.clone())
        .producer(replies)
        .request_reply_client(pricing.clone())
        .topology_manager(topology)
        .consumer(order_log)
        .consumer(price_service)
        .build();

    let traffic = tokio::spawn(generate_orders(orders, pricing));

    MessagingHost::new(client, config)
        .run_until_ctrl_c()
        .await
        .context("messaging host failed")?;

    traffic.abort();
    tracing::info!("Relay stopped");
    Ok(())
}

/// Publish an order and ask for its price every five seconds.
async fn generate_orders(orders: Arc<RedpandaProducer>, pricing: Arc<RedpandaRequestReplyClient>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    let mut order_id = 0_u64;

    loop {
        ticker.tick().await;
        order_id += 1;
        let order = OrderPlaced {
            order_id,
            sku: format!("sku-{}", order_id % 7),
        };

        let message = match Message::encode(&order) {
            Ok(message) => message.with_key(order.sku.clone()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode order");
                continue;
            },
        };
        if let Err(e) = orders.send(&message).await {
            // Expected until the host has finished starting
            tracing::debug!(error = %e, "Order not sent");
            continue;
        }

        match pricing
            .request(Message::new(order.sku.into_bytes()), Duration::from_secs(10))
            .await
        {
            Ok(reply) => tracing::info!(
                order_id,
                price = %String::from_utf8_lossy(&reply.payload),
                "Price received"
            ),
            Err(e) => tracing::warn!(order_id, error = %e, "Price request failed"),
        }
    }
}
