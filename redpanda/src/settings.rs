//! Connection settings shared by every Redpanda resource.

use messaging_host_core::ClientError;
use rdkafka::config::ClientConfig;
use std::env;
use std::time::Duration;

/// Environment variable holding the comma-separated broker list
pub const BROKERS_ENV: &str = "REDPANDA_BROKERS";

/// Environment variable holding the client id
pub const CLIENT_ID_ENV: &str = "REDPANDA_CLIENT_ID";

/// Broker connection settings.
///
/// One value is usually shared by every producer, consumer, topology manager
/// and request-reply client of an application. Cloning is cheap.
///
/// # Example
///
/// ```
/// use messaging_host_redpanda::RedpandaSettings;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), messaging_host_core::ClientError> {
/// let settings = RedpandaSettings::builder()
///     .brokers("localhost:9092,localhost:9093")
///     .client_id("billing")
///     .producer_acks("all")
///     .compression("lz4")
///     .send_timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedpandaSettings {
    brokers: String,
    client_id: String,
    producer_acks: String,
    compression: String,
    send_timeout: Duration,
    metadata_timeout: Duration,
    auto_offset_reset: String,
    session_timeout: Duration,
}

impl RedpandaSettings {
    /// Create settings for `brokers` with default values for everything else.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionFailed`] if `brokers` is empty.
    pub fn new(brokers: &str) -> Result<Self, ClientError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder.
    #[must_use]
    pub fn builder() -> RedpandaSettingsBuilder {
        RedpandaSettingsBuilder::default()
    }

    /// Load settings from `REDPANDA_BROKERS` and `REDPANDA_CLIENT_ID`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionFailed`] if no brokers are configured.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut builder = Self::builder();
        if let Ok(brokers) = env::var(BROKERS_ENV) {
            builder = builder.brokers(brokers);
        }
        if let Ok(client_id) = env::var(CLIENT_ID_ENV) {
            builder = builder.client_id(client_id);
        }
        builder.build()
    }

    /// Comma-separated broker list
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    /// Client id reported to the broker
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Producer send timeout
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Timeout for metadata and admin requests
    #[must_use]
    pub const fn metadata_timeout(&self) -> Duration {
        self.metadata_timeout
    }

    /// Base configuration every client starts from
    pub(crate) fn base_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("client.id", &self.client_id);
        config
    }

    /// Producer configuration
    pub(crate) fn producer_config(&self) -> ClientConfig {
        let mut config = self.base_config();
        config
            .set("message.timeout.ms", self.send_timeout.as_millis().to_string())
            .set("acks", &self.producer_acks)
            .set("compression.type", &self.compression);
        config
    }

    /// Consumer configuration with manual commits for at-least-once delivery
    pub(crate) fn consumer_config(&self, group_id: &str) -> ClientConfig {
        let mut config = self.base_config();
        config
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("session.timeout.ms", self.session_timeout.as_millis().to_string())
            .set("enable.partition.eof", "false");
        config
    }
}

/// Builder for [`RedpandaSettings`].
#[derive(Debug, Default)]
pub struct RedpandaSettingsBuilder {
    brokers: Option<String>,
    client_id: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    send_timeout: Option<Duration>,
    metadata_timeout: Option<Duration>,
    auto_offset_reset: Option<String>,
    session_timeout: Option<Duration>,
}

impl RedpandaSettingsBuilder {
    /// Set the broker addresses (comma-separated, e.g. "localhost:9092")
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the client id. Default: "messaging-host"
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the producer acknowledgment mode: "0", "1" or "all". Default: "all"
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec: "none", "gzip", "snappy", "lz4", "zstd". Default: "none"
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the producer send timeout. Default: 5 seconds
    #[must_use]
    pub const fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Set the metadata/admin request timeout. Default: 10 seconds
    #[must_use]
    pub const fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = Some(timeout);
        self
    }

    /// Set where new consumer groups start reading:
    /// "earliest", "latest" or "error". Default: "latest"
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Set the consumer group session timeout. Default: 6 seconds
    #[must_use]
    pub const fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Build the [`RedpandaSettings`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionFailed`] if brokers are not set or empty.
    pub fn build(self) -> Result<RedpandaSettings, ClientError> {
        let brokers = self
            .brokers
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| ClientError::ConnectionFailed("Brokers not configured".to_string()))?;

        Ok(RedpandaSettings {
            brokers,
            client_id: self.client_id.unwrap_or_else(|| "messaging-host".to_string()),
            producer_acks: self.producer_acks.unwrap_or_else(|| "all".to_string()),
            compression: self.compression.unwrap_or_else(|| "none".to_string()),
            send_timeout: self.send_timeout.unwrap_or(Duration::from_secs(5)),
            metadata_timeout: self.metadata_timeout.unwrap_or(Duration::from_secs(10)),
            auto_offset_reset: self
                .auto_offset_reset
                .unwrap_or_else(|| "latest".to_string()),
            session_timeout: self.session_timeout.unwrap_or(Duration::from_secs(6)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_brokers() {
        assert!(matches!(
            RedpandaSettings::builder().build(),
            Err(ClientError::ConnectionFailed(_))
        ));
        assert!(RedpandaSettings::new("  ").is_err());
    }

    #[test]
    fn defaults_are_applied() {
        let settings = RedpandaSettings::new("localhost:9092").unwrap();

        assert_eq!(settings.brokers(), "localhost:9092");
        assert_eq!(settings.client_id(), "messaging-host");
        assert_eq!(settings.send_timeout(), Duration::from_secs(5));
        assert_eq!(settings.metadata_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn consumer_config_disables_auto_commit() {
        let settings = RedpandaSettings::builder()
            .brokers("localhost:9092")
            .auto_offset_reset("earliest")
            .build()
            .unwrap();

        let config = settings.consumer_config("orders-projection");

        assert_eq!(config.get("group.id"), Some("orders-projection"));
        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("auto.offset.reset"), Some("earliest"));
        assert_eq!(config.get("session.timeout.ms"), Some("6000"));
    }

    #[test]
    fn producer_config_carries_acks_and_timeout() {
        let settings = RedpandaSettings::builder()
            .brokers("localhost:9092")
            .producer_acks("1")
            .send_timeout(Duration::from_millis(2500))
            .build()
            .unwrap();

        let config = settings.producer_config();

        assert_eq!(config.get("acks"), Some("1"));
        assert_eq!(config.get("message.timeout.ms"), Some("2500"));
        assert_eq!(config.get("compression.type"), Some("none"));
    }
}
