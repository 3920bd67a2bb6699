//! History lookup seam
//!
//! Grab history is the pipeline's evidence that the application asked for a
//! download. It is only needed for downloads without a category.

use async_trait::async_trait;

use crate::db::Database;
use crate::types::{DownloadId, HistoryRecord};

/// Trait for looking up history records by download ID
#[async_trait]
pub trait HistoryLookup: Send + Sync {
    /// The most recent history record for `download_id`, if any
    async fn most_recent_for_download_id(
        &self,
        download_id: &DownloadId,
    ) -> crate::Result<Option<HistoryRecord>>;
}

#[async_trait]
impl HistoryLookup for Database {
    async fn most_recent_for_download_id(
        &self,
        download_id: &DownloadId,
    ) -> crate::Result<Option<HistoryRecord>> {
        Database::most_recent_for_download_id(self, download_id).await
    }
}

/// History lookup that never finds anything
///
/// Used when no history store is configured: only downloads with a category are
/// imported.
pub struct NoHistory;

#[async_trait]
impl HistoryLookup for NoHistory {
    async fn most_recent_for_download_id(
        &self,
        _download_id: &DownloadId,
    ) -> crate::Result<Option<HistoryRecord>> {
        Ok(None)
    }
}
