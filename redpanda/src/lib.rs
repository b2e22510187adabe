//! Redpanda messaging resources for Messaging Host.
//!
//! This crate provides Kafka-protocol implementations of the four resource
//! kinds from `messaging-host-core`, built on rdkafka:
//!
//! - [`RedpandaProducer`]: publishes messages to a topic
//! - [`RedpandaRequestReplyClient`]: correlated request/response over a
//!   request topic and a reply topic
//! - [`RedpandaTopologyManager`]: declares topics before messaging begins
//! - [`RedpandaConsumer`]: feeds a topic to a [`MessageHandler`]
//!
//! They work with any Kafka-compatible broker (Redpanda, Apache Kafka,
//! AWS MSK, ...).
//!
//! # Example
//!
//! ```no_run
//! use messaging_host_core::{ClientError, Message};
//! use messaging_host_redpanda::{
//!     RedpandaConsumer, RedpandaProducer, RedpandaSettings, RedpandaTopologyManager, TopicSpec,
//! };
//! use messaging_host_runtime::{HostConfig, MessagingClient, MessagingHost};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = RedpandaSettings::new("localhost:9092")?;
//!
//! let producer = Arc::new(RedpandaProducer::new("orders", "order-events", settings.clone()));
//! let topology = Arc::new(RedpandaTopologyManager::new(
//!     "orders",
//!     settings.clone(),
//!     vec![TopicSpec::new("order-events").partitions(3)],
//! ));
//! let consumer = Arc::new(RedpandaConsumer::new(
//!     "audit",
//!     "order-events",
//!     "audit",
//!     settings,
//!     Arc::new(|message: Message| async move {
//!         println!("{:?}", message.key);
//!         Ok::<(), ClientError>(())
//!     }),
//! ));
//!
//! let client = MessagingClient::builder()
//!     .producer(producer)
//!     .topology_manager(topology)
//!     .consumer(consumer)
//!     .build();
//!
//! MessagingHost::new(client, HostConfig::from_env())
//!     .run_until_ctrl_c()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`MessageHandler`]: messaging_host_core::MessageHandler

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod consumer;
mod producer;
mod record;
mod request_reply;
mod settings;
mod topology;

pub use consumer::RedpandaConsumer;
pub use producer::RedpandaProducer;
pub use request_reply::RedpandaRequestReplyClient;
pub use settings::{BROKERS_ENV, CLIENT_ID_ENV, RedpandaSettings, RedpandaSettingsBuilder};
pub use topology::{RedpandaTopologyManager, TopicSpec};
