//! The completed download import pipeline, split into focused submodules.
//!
//! The `ImportPipeline` struct and its methods are organized by domain:
//! - [`cycle`] - One poll cycle: gateway, registry merge, media resolution, imports
//! - [`process`] - Gating, import attempt and state transition for one download
//! - [`poller`] - Periodic driver and shutdown
//! - [`subscribers`] - Built-in event bus subscribers

mod cycle;
mod poller;
mod process;
mod subscribers;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use cycle::PollSummary;
pub use process::ProcessOutcome;

use crate::client::ClientGateway;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::EventPublisher;
use crate::history::HistoryLookup;
use crate::import::ImportService;
use crate::resolver::MediaResolver;
use crate::tracking::TrackedDownloadRegistry;
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

/// Main pipeline instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ImportPipeline {
    /// Configuration (read-only for the lifetime of the pipeline)
    pub(crate) config: Arc<Config>,
    /// Registered download clients
    pub(crate) gateway: ClientGateway,
    /// Tracked downloads, shared by every cycle and import task
    pub(crate) registry: TrackedDownloadRegistry,
    /// Event bus
    pub(crate) events: EventPublisher,
    /// File-level import engine
    pub(crate) import_service: Arc<dyn ImportService>,
    /// Grab history, consulted for downloads without a category
    pub(crate) history: Arc<dyn HistoryLookup>,
    /// Optional media resolver
    pub(crate) resolver: Option<Arc<dyn MediaResolver>>,
    /// Limits concurrent import attempts (respects max_concurrent_imports config)
    pub(crate) import_limit: Arc<Semaphore>,
    /// Cancelled on shutdown; stops the poller and subscribers
    pub(crate) shutdown_token: CancellationToken,
}

impl ImportPipeline {
    /// Create a new pipeline
    ///
    /// Validates the configuration. Nothing runs until [`poll_once`](Self::poll_once)
    /// is called or the poller is started with [`start_poller`](Self::start_poller).
    pub fn new(
        config: Config,
        gateway: ClientGateway,
        import_service: Arc<dyn ImportService>,
        history: Arc<dyn HistoryLookup>,
    ) -> Result<Self> {
        config.validate()?;

        let import_limit = Arc::new(Semaphore::new(config.import.max_concurrent_imports));

        tracing::info!(
            clients = gateway.len(),
            max_concurrent_imports = config.import.max_concurrent_imports,
            intake_folder = ?config.intake_folder(),
            "Import pipeline initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            gateway,
            registry: TrackedDownloadRegistry::new(),
            events: EventPublisher::new(),
            import_service,
            history,
            resolver: None,
            import_limit,
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Attach a media resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn MediaResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Publish on an existing event bus instead of a private one
    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    /// Subscribe to pipeline events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use completed_import::ImportPipeline;
    /// # use completed_import::types::Event;
    /// # fn example(pipeline: &ImportPipeline) {
    /// let mut events = pipeline.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         if let Event::DownloadCompleted { tracked } = event {
    ///             tracing::info!(download_id = %tracked.download_id(), "imported");
    ///         }
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The event bus this pipeline publishes on
    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    /// Handle to the tracked download registry
    pub fn registry(&self) -> &TrackedDownloadRegistry {
        &self.registry
    }

    /// Get the current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Fail fast once shutdown has begun
    pub(crate) fn ensure_running(&self) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ShuttingDown);
        }
        Ok(())
    }
}
