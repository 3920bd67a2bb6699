//! Built-in event bus subscribers.

use crate::db::{Database, NewHistoryRecord};
use crate::tracking::TrackedDownload;
use crate::types::{Event, HistoryEventType};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ImportPipeline;

impl ImportPipeline {
    /// Start the background task that records imports in the history table
    ///
    /// Every `DownloadCompleted` event becomes a `DownloadImported` history record,
    /// carrying the resolved series and episodes when known. A lagging recorder logs
    /// how many events it missed and keeps going. The task exits on
    /// [`shutdown`](Self::shutdown) once the events already queued are written.
    pub fn start_history_recorder(&self, db: Arc<Database>) -> JoinHandle<()> {
        let mut events = self.subscribe();
        let token = self.shutdown_token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = events.recv() => match received {
                        Ok(Event::DownloadCompleted { tracked }) => record_import(&db, &tracked).await,
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "History recorder lagged behind the event bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            info!("History recorder stopped");
        });

        info!("History recorder background task started");

        handle
    }
}

async fn record_import(db: &Database, tracked: &TrackedDownload) {
    let item = &tracked.download_item;
    let media = tracked.resolved_media.as_ref();

    let record = NewHistoryRecord {
        download_id: item.download_id.clone(),
        event_type: HistoryEventType::DownloadImported,
        source_title: item.title.clone(),
        series_id: media.map(|m| m.series.id),
        episode_ids: media.map(|m| m.episode_ids()).unwrap_or_default(),
        date: chrono::Utc::now(),
    };

    match db.insert_history(&record).await {
        Ok(id) => debug!(download_id = %item.download_id, history_id = id, "Recorded import"),
        Err(e) => error!(
            download_id = %item.download_id,
            error = %e,
            "Failed to record import in history"
        ),
    }
}
