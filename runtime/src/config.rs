//! Host configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Environment variable holding the start timeout in seconds
pub const START_TIMEOUT_ENV: &str = "MESSAGING_START_TIMEOUT_SECS";

/// Environment variable holding the shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_ENV: &str = "MESSAGING_SHUTDOWN_TIMEOUT_SECS";

/// Timeouts applied by [`MessagingHost`](crate::host::MessagingHost).
///
/// # Default Values
///
/// - `start_timeout`: none (startup may take as long as it needs)
/// - `shutdown_timeout`: 30 seconds
///
/// # Example
///
/// ```
/// use messaging_host_runtime::HostConfig;
/// use std::time::Duration;
///
/// let config = HostConfig::default()
///     .with_start_timeout(Duration::from_secs(10))
///     .with_shutdown_timeout(Duration::from_secs(60));
///
/// assert_eq!(config.start_timeout, Some(Duration::from_secs(10)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Maximum time allowed for the whole startup sequence
    pub start_timeout: Option<Duration>,
    /// Maximum time allowed for the whole shutdown sequence
    pub shutdown_timeout: Duration,
}

impl HostConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(start_timeout: Option<Duration>, shutdown_timeout: Duration) -> Self {
        Self {
            start_timeout,
            shutdown_timeout,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let seconds = |name: &str| {
            lookup(name)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        Self {
            start_timeout: seconds(START_TIMEOUT_ENV).or(defaults.start_timeout),
            shutdown_timeout: seconds(SHUTDOWN_TIMEOUT_ENV).unwrap_or(defaults.shutdown_timeout),
        }
    }

    /// Set the start timeout
    #[must_use]
    pub const fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = Some(timeout);
        self
    }

    /// Set the shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            start_timeout: None,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}
