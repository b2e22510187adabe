//! Process-level hosting for a [`MessagingClient`].
//!
//! [`MessagingHost`] ties the coordinator to an application's lifecycle:
//! start everything when the process comes up, wait for a shutdown signal,
//! then stop everything within a deadline.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging_host_runtime::{HostConfig, MessagingClient, MessagingHost};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = MessagingClient::builder()
//!         .producer(producer)
//!         .consumer(consumer)
//!         .build();
//!
//!     MessagingHost::new(client, HostConfig::from_env())
//!         .run_until_ctrl_c()
//!         .await?;
//!     Ok(())
//! }
//! ```

use crate::client::MessagingClient;
use crate::config::HostConfig;
use crate::error::HostError;
use messaging_host_core::CancellationToken;
use std::future::Future;

/// Runs a [`MessagingClient`] for the lifetime of a process.
#[derive(Debug, Clone)]
pub struct MessagingHost {
    client: MessagingClient,
    config: HostConfig,
}

impl MessagingHost {
    /// Create a host for `client`.
    #[must_use]
    pub const fn new(client: MessagingClient, config: HostConfig) -> Self {
        Self { client, config }
    }

    /// The hosted client
    #[must_use]
    pub const fn client(&self) -> &MessagingClient {
        &self.client
    }

    /// The host configuration
    #[must_use]
    pub const fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Start the client.
    ///
    /// Resources receive a child of `cancellation`. When a start timeout is
    /// configured and elapses, that child token is cancelled and the startup
    /// sequence is awaited until the pending resource gives up.
    ///
    /// # Errors
    ///
    /// - [`HostError::Start`]: a resource failed or observed cancellation
    /// - [`HostError::StartTimeout`]: the start timeout elapsed
    pub async fn start(&self, cancellation: &CancellationToken) -> Result<(), HostError> {
        let token = cancellation.child_token();

        let Some(limit) = self.config.start_timeout else {
            return self.client.start(token).await.map_err(HostError::Start);
        };

        let start = self.client.start(token.clone());
        tokio::pin!(start);

        tokio::select! {
            biased;
            result = &mut start => result.map_err(HostError::Start),
            () = tokio::time::sleep(limit) => {
                tracing::error!(timeout_ms = limit.as_millis(), "Messaging client start timed out");
                token.cancel();
                if let Err(e) = start.await {
                    tracing::debug!(error = %e, "Startup abandoned after timeout");
                }
                Err(HostError::StartTimeout(limit))
            }
        }
    }

    /// Stop the client within the configured shutdown timeout.
    ///
    /// When the timeout elapses the stop sequence is dropped where it stands;
    /// resources it had not reached yet are left running.
    ///
    /// # Errors
    ///
    /// - [`HostError::Stop`]: a resource failed to stop
    /// - [`HostError::ShutdownTimeout`]: the shutdown timeout elapsed
    pub async fn stop(&self) -> Result<(), HostError> {
        let limit = self.config.shutdown_timeout;

        let stop = self.client.stop(CancellationToken::new());

        if let Ok(result) = tokio::time::timeout(limit, stop).await {
            result.map_err(HostError::Stop)
        } else {
            tracing::error!(timeout_ms = limit.as_millis(), "Messaging client shutdown timed out");
            Err(HostError::ShutdownTimeout(limit))
        }
    }

    /// Start the client, run until `shutdown` resolves, then stop it.
    ///
    /// Startup is always polled before `shutdown`, so a shutdown future that is
    /// already complete still lets a startup that finishes without suspending
    /// run to the end. If `shutdown` resolves while startup is suspended,
    /// startup is cancelled. A failed startup is returned without calling stop.
    ///
    /// # Errors
    ///
    /// Returns the first [`HostError`] from starting or stopping.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), HostError>
    where
        F: Future<Output = ()>,
    {
        let cancellation = CancellationToken::new();
        let start = self.start(&cancellation);
        tokio::pin!(start);
        tokio::pin!(shutdown);

        tokio::select! {
            biased;
            result = &mut start => result?,
            () = &mut shutdown => {
                tracing::warn!("Shutdown requested during startup");
                cancellation.cancel();
                start.await?;
                return self.stop().await;
            }
        }

        tracing::info!("Messaging host running");
        shutdown.await;
        tracing::info!("Shutdown requested");

        self.stop().await
    }

    /// [`run_until`](Self::run_until) Ctrl-C is received.
    ///
    /// # Errors
    ///
    /// Returns the first [`HostError`] from starting or stopping.
    pub async fn run_until_ctrl_c(&self) -> Result<(), HostError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C, shutting down");
            }
        })
        .await
    }
}
