//! Tracked downloads and their import state machine
//!
//! A [`TrackedDownload`] is the pipeline's durable view of one external download: the
//! latest snapshot the client reported, merged with what the pipeline knows locally
//! (resolved media, import state, attempt count).
//!
//! All state changes go through [`TrackedDownload::transition_to`], which rejects
//! transitions the state machine does not allow:
//!
//! ```text
//! Downloading   -> Importing
//! ImportPending -> Importing
//! Importing     -> Imported | ImportPending | ImportFailed
//! Downloading | ImportPending | ImportFailed -> Downloading   (client re-queued the item)
//! Imported      -> (terminal)
//! ```

mod registry;

pub use registry::{ImportClaim, TrackedDownloadRegistry};

use crate::error::{Error, Result};
use crate::types::{DownloadClientItem, DownloadId, ResolvedMedia};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Import state of a tracked download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedDownloadState {
    /// The client has not finished, or the download is not yet eligible
    Downloading,
    /// An import attempt failed; the download will be retried next cycle
    ImportPending,
    /// An import attempt is in flight
    Importing,
    /// Every file was imported (terminal)
    Imported,
    /// Import attempts were exhausted; waits for the client to re-queue the item
    ImportFailed,
}

impl TrackedDownloadState {
    /// Whether the state machine allows moving from `self` to `to`
    pub fn can_transition_to(self, to: TrackedDownloadState) -> bool {
        use TrackedDownloadState::*;

        matches!(
            (self, to),
            (Downloading | ImportPending, Importing)
                | (Importing, Imported | ImportPending | ImportFailed)
                | (Downloading | ImportPending | ImportFailed, Downloading)
        )
    }
}

impl std::fmt::Display for TrackedDownloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TrackedDownloadState::Downloading => "downloading",
            TrackedDownloadState::ImportPending => "import_pending",
            TrackedDownloadState::Importing => "importing",
            TrackedDownloadState::Imported => "imported",
            TrackedDownloadState::ImportFailed => "import_failed",
        };
        f.write_str(name)
    }
}

/// The pipeline's view of one external download
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedDownload {
    /// Latest snapshot reported by the download client
    pub download_item: DownloadClientItem,

    /// Series and episodes, once a resolver attached them
    pub resolved_media: Option<ResolvedMedia>,

    /// Current import state
    pub state: TrackedDownloadState,

    /// Number of import attempts started
    pub import_attempts: u32,

    /// Messages from the most recent failed attempt
    pub status_messages: Vec<String>,

    /// When the download was first observed
    pub first_seen: DateTime<Utc>,

    /// When the client last reported the download
    pub last_seen: DateTime<Utc>,
}

impl TrackedDownload {
    /// Start tracking a newly observed download
    pub fn new(download_item: DownloadClientItem, now: DateTime<Utc>) -> Self {
        Self {
            download_item,
            resolved_media: None,
            state: TrackedDownloadState::Downloading,
            import_attempts: 0,
            status_messages: Vec::new(),
            first_seen: now,
            last_seen: now,
        }
    }

    /// Client-assigned download ID
    pub fn download_id(&self) -> &DownloadId {
        &self.download_item.download_id
    }

    /// Apply a state transition, rejecting ones the state machine does not allow
    pub fn transition_to(&mut self, to: TrackedDownloadState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                download_id: self.download_id().clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
