//! Periodic driver and graceful shutdown.

use crate::error::{Error, Result};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::ImportPipeline;

impl ImportPipeline {
    /// Start the background task that runs [`poll_once`](Self::poll_once) every
    /// `poll_interval`
    ///
    /// The first cycle runs immediately. Cycles never overlap: a slow cycle delays
    /// the next tick instead of queueing extra ones. The task exits on
    /// [`shutdown`](Self::shutdown).
    pub fn start_poller(&self) -> JoinHandle<()> {
        if !self.config.polling.enabled {
            info!("Polling disabled, skipping import poller");
            return tokio::spawn(async {});
        }

        let pipeline = self.clone();
        let token = self.shutdown_token.clone();
        let poll_interval = self.config.polling.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Import poller shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match pipeline.poll_once().await {
                            Ok(summary) => debug!(?summary, "poll cycle finished"),
                            Err(Error::ShuttingDown) => break,
                            Err(e) => error!(error = %e, "poll cycle failed"),
                        }
                    }
                }
            }
        });

        info!(
            poll_interval_secs = poll_interval.as_secs(),
            "Import poller background task started"
        );

        handle
    }

    /// Gracefully shut down the pipeline
    ///
    /// Stops the poller and subscribers, then waits up to 30 seconds for import
    /// attempts already in flight to finish. No new attempts start afterwards: a
    /// call that was already waiting for a permit returns `Error::ShuttingDown` once
    /// it gets one.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown");
        self.shutdown_token.cancel();

        // Config validation keeps this within u32
        let permits = u32::try_from(self.config.import.max_concurrent_imports).unwrap_or(u32::MAX);
        let shutdown_timeout = std::time::Duration::from_secs(30);

        match tokio::time::timeout(shutdown_timeout, self.import_limit.acquire_many(permits)).await
        {
            Ok(Ok(_permits)) => info!("All in-flight imports finished"),
            Ok(Err(_)) => debug!("Import limiter already closed"),
            Err(_) => warn!("Timeout waiting for in-flight imports, proceeding with shutdown"),
        }

        // Anything still waiting for a permit gets Error::ShuttingDown
        self.import_limit.close();

        info!("Shutdown complete");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }
}
