//! Media resolution seam
//!
//! Working out which series and episodes a release contains belongs to the library
//! catalog. The pipeline only asks a [`MediaResolver`] once per cycle for downloads
//! that have no media yet, and attaches whatever comes back.

use async_trait::async_trait;

use crate::types::{DownloadClientItem, HistoryRecord, ResolvedMedia};

/// Trait for resolving the media identity of a download
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolve `item`, using its grab history when available
    ///
    /// `Ok(None)` means the release could not be matched yet; the pipeline asks
    /// again next cycle.
    async fn resolve(
        &self,
        item: &DownloadClientItem,
        grab_history: Option<&HistoryRecord>,
    ) -> crate::Result<Option<ResolvedMedia>>;
}
