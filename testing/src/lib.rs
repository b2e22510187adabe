//! # Messaging Host Testing
//!
//! Testing utilities and helpers for the Messaging Host architecture.
//!
//! This crate provides:
//! - Recording mock resources that log every lifecycle call in order
//! - A recording message handler
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```
//! use messaging_host_core::{CancellationToken, Producer};
//! use messaging_host_testing::{Journal, MockResource};
//!
//! # async fn example() {
//! let journal = Journal::new();
//! let producer = MockResource::new("P1", &journal);
//!
//! Producer::start(&producer, CancellationToken::new()).await.unwrap();
//! Producer::stop(&producer).await.unwrap();
//!
//! assert_eq!(journal.entries(), vec!["P1.start", "P1.stop"]);
//! # }
//! ```

/// Recording mock resources
pub mod mocks;

// Re-export commonly used items
pub use mocks::{Journal, MockResource, Operation, RecordingHandler};

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Honours `RUST_LOG`, defaulting to `debug`.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
