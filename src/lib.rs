//! # completed-import
//!
//! Completed download import pipeline for a personal media library.
//!
//! The pipeline watches external download clients, decides when a finished download
//! is safe to import, hands it to a file-level import engine, and reduces the
//! per-file results into one all-or-nothing outcome per download.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI; download clients, the import engine, history
//!   and media resolution are traits the embedding application implements
//! - **Never import twice** - An imported download is terminal, and at most one
//!   import attempt per download runs at any time
//! - **Never import what nobody asked for** - Downloads without a category need a
//!   recorded grab before they are touched
//! - **Event-driven** - Consumers subscribe to events, the pipeline never calls them
//!
//! ## Quick Start
//!
//! ```no_run
//! use completed_import::{ClientGateway, Config, Database, ImportPipeline};
//! use completed_import::import::ImportService;
//! use std::sync::Arc;
//!
//! # async fn example(importer: Arc<dyn ImportService>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//!
//! let pipeline = ImportPipeline::new(config, ClientGateway::default(), importer, db.clone())?;
//!
//! // Subscribe to events
//! let mut events = pipeline.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! pipeline.start_history_recorder(db);
//! pipeline.start_poller();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Download client capability and gateway
pub mod client;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Event bus
pub mod events;
/// Import eligibility rules
pub mod gating;
/// History lookup
pub mod history;
/// File-level import seam and result aggregation
pub mod import;
/// Poll cycle, import orchestration and background tasks
pub mod pipeline;
/// Media resolution
pub mod resolver;
/// Tracked downloads and the import state machine
pub mod tracking;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::{ClientGateway, DownloadClient};
pub use config::{Config, RemovalPolicy};
pub use db::Database;
pub use error::{DatabaseError, Error, Result};
pub use events::EventPublisher;
pub use gating::{BlockReason, Eligibility};
pub use pipeline::{ImportPipeline, PollSummary, ProcessOutcome};
pub use tracking::{ImportClaim, TrackedDownload, TrackedDownloadRegistry, TrackedDownloadState};
pub use types::{
    ClientId, DownloadClientItem, DownloadId, DownloadItemStatus, Event, HistoryRecord,
    ImportDecision, ImportResult, ResolvedMedia,
};

/// Helper function to run the pipeline with graceful signal handling.
///
/// Starts the poller, waits for a termination signal, then calls the pipeline's
/// `shutdown()` method and waits for the poller to stop.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use completed_import::{ClientGateway, Config, ImportPipeline, run_with_shutdown};
/// use completed_import::history::NoHistory;
/// use completed_import::import::ImportService;
/// use std::sync::Arc;
///
/// # async fn example(importer: Arc<dyn ImportService>) -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = ImportPipeline::new(
///     Config::default(),
///     ClientGateway::default(),
///     importer,
///     Arc::new(NoHistory),
/// )?;
///
/// // Run with automatic signal handling
/// run_with_shutdown(pipeline).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_with_shutdown(pipeline: ImportPipeline) -> Result<()> {
    let poller = pipeline.start_poller();
    wait_for_signal().await;
    pipeline.shutdown().await?;

    if let Err(e) = poller.await {
        tracing::warn!(error = %e, "Import poller task ended abnormally");
    }

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
