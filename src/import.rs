//! File-level import seam and result aggregation
//!
//! The import engine itself (filename parsing, matching files to episodes, copying or
//! hard-linking into the library) lives behind the [`ImportService`] trait. The
//! pipeline only hands it a path and reduces what comes back with [`reduce`].

use async_trait::async_trait;
use std::path::Path;

use crate::types::{DownloadClientItem, ImportResult};

/// Trait for the file-level import engine
///
/// # Errors
///
/// Implementations report per-file problems inside the returned results and never
/// as an error. An `Err` is reserved for catastrophic conditions such as an
/// inaccessible path; the pipeline treats it exactly like an empty result list.
#[async_trait]
pub trait ImportService: Send + Sync {
    /// Import every media file under `path`, which belongs to `item`
    async fn process_path(
        &self,
        path: &Path,
        item: &DownloadClientItem,
    ) -> crate::Result<Vec<ImportResult>>;
}

/// All-or-nothing outcome of one import attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Every file was imported
    Success,
    /// At least one file was not imported, or nothing was imported at all
    Failure,
}

/// Reduce per-file results to an outcome
///
/// A download is one unit of work: the attempt succeeds only when there is at least
/// one result and every result is a success. Rejected and skipped files are treated
/// the same way.
pub fn reduce(results: &[ImportResult]) -> ImportOutcome {
    if !results.is_empty() && results.iter().all(ImportResult::is_success) {
        ImportOutcome::Success
    } else {
        ImportOutcome::Failure
    }
}

/// Messages explaining why results were not successful, prefixed with the file name
pub fn failure_messages(results: &[ImportResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| !r.is_success())
        .flat_map(|r| {
            let file = r
                .decision
                .local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| r.decision.local_path.display().to_string());
            r.messages()
                .into_iter()
                .map(move |m| format!("{file}: {m}"))
        })
        .collect()
}
