//! Process-wide registry of tracked downloads.

use crate::error::{Error, Result};
use crate::gating::{BlockReason, Eligibility};
use crate::import::ImportOutcome;
use crate::types::{ClientId, DownloadClientItem, DownloadId, DownloadItemStatus, ResolvedMedia};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{TrackedDownload, TrackedDownloadState};

/// Result of trying to claim a download for import
#[derive(Clone, Debug)]
pub enum ImportClaim {
    /// The download is now `Importing`; this is the claimed snapshot
    Claimed(TrackedDownload),
    /// The live entry failed the check and was not touched
    Blocked(BlockReason),
}

/// Registry of tracked downloads keyed by download ID
///
/// The registry is the only shared mutable structure in the pipeline. Every
/// operation takes the lock exactly once, so a merge applies a whole poll's worth of
/// snapshots atomically. Callers only ever receive clones; entries are never handed
/// out by reference.
///
/// Cloning the registry is cheap and yields a handle to the same entries.
#[derive(Clone, Default)]
pub struct TrackedDownloadRegistry {
    entries: Arc<Mutex<HashMap<DownloadId, TrackedDownload>>>,
}

impl TrackedDownloadRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a poll's snapshots into the registry
    ///
    /// New IDs start tracking in `Downloading`. Known IDs get their snapshot
    /// replaced; their state is left alone unless the client moved the item from
    /// `Completed` back to a non-terminal status, which resets it to `Downloading`.
    /// `Importing` and `Imported` entries are never reset. Resolved media is never
    /// touched.
    ///
    /// Returns clones of the merged entries, one per distinct ID, in input order.
    pub async fn merge(&self, items: Vec<DownloadClientItem>) -> Vec<TrackedDownload> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let mut merged_ids: Vec<DownloadId> = Vec::with_capacity(items.len());
        let mut merged_set: HashSet<DownloadId> = HashSet::with_capacity(items.len());

        for item in items {
            let id = item.download_id.clone();

            match entries.get_mut(&id) {
                Some(tracked) => {
                    let regressed = tracked.download_item.status == DownloadItemStatus::Completed
                        && !item.status.is_terminal()
                        && tracked.state != TrackedDownloadState::Downloading;

                    tracked.download_item = item;
                    tracked.last_seen = now;

                    if regressed && tracked.state.can_transition_to(TrackedDownloadState::Downloading)
                    {
                        info!(
                            download_id = %id,
                            from = %tracked.state,
                            "client re-queued completed download, resetting to downloading"
                        );
                        tracked.state = TrackedDownloadState::Downloading;
                        tracked.status_messages.clear();
                    } else if regressed {
                        debug!(
                            download_id = %id,
                            state = %tracked.state,
                            "client re-queued download, keeping state"
                        );
                    }
                }
                None => {
                    debug!(
                        download_id = %id,
                        title = %item.title,
                        client_id = %item.client_id,
                        "tracking new download"
                    );
                    entries.insert(id.clone(), TrackedDownload::new(item, now));
                }
            }

            if merged_set.insert(id.clone()) {
                merged_ids.push(id);
            }
        }

        merged_ids
            .iter()
            .filter_map(|id| entries.get(id).cloned())
            .collect()
    }

    /// Copy of one tracked download
    pub async fn get(&self, id: &DownloadId) -> Option<TrackedDownload> {
        self.entries.lock().await.get(id).cloned()
    }

    /// Copies of every tracked download, ordered by download ID
    pub async fn snapshot(&self) -> Vec<TrackedDownload> {
        let entries = self.entries.lock().await;
        let mut all: Vec<TrackedDownload> = entries.values().cloned().collect();
        all.sort_by(|a, b| a.download_id().cmp(b.download_id()));
        all
    }

    /// Number of tracked downloads
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether nothing is tracked
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Attach resolved media to a tracked download
    ///
    /// Media is attached once. Returns `Ok(false)` without changing anything when
    /// the download already has media.
    pub async fn attach_media(&self, id: &DownloadId, media: ResolvedMedia) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let tracked = entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        if tracked.resolved_media.is_some() {
            return Ok(false);
        }

        tracked.resolved_media = Some(media);
        Ok(true)
    }

    /// Atomically move a download to `Importing`
    ///
    /// This is the guard that keeps at most one import attempt in flight per ID:
    /// the state check and the state change happen under the same lock, so a
    /// concurrent caller sees `Importing` and gets `Error::InvalidTransition`.
    pub async fn begin_import(&self, id: &DownloadId) -> Result<TrackedDownload> {
        let mut entries = self.entries.lock().await;
        let tracked = entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        claim(tracked)
    }

    /// Move a download to `Importing` if `check` still passes on the live entry
    ///
    /// `check` runs under the registry lock, so a merge that lands between an
    /// earlier gating decision and this call is always seen. A blocked entry is left
    /// untouched.
    pub async fn begin_import_if<F>(&self, id: &DownloadId, check: F) -> Result<ImportClaim>
    where
        F: FnOnce(&TrackedDownload) -> Eligibility,
    {
        let mut entries = self.entries.lock().await;
        let tracked = entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        // Importing falls through so the caller sees InvalidTransition
        if tracked.state != TrackedDownloadState::Importing
            && let Eligibility::Blocked(reason) = check(tracked)
        {
            return Ok(ImportClaim::Blocked(reason));
        }

        claim(tracked).map(ImportClaim::Claimed)
    }

    /// Apply the outcome of an import attempt
    ///
    /// Success moves the download to `Imported`. Failure moves it to
    /// `ImportPending`, or to `ImportFailed` once `max_attempts` attempts have been
    /// made.
    pub async fn finish_import(
        &self,
        id: &DownloadId,
        outcome: ImportOutcome,
        messages: Vec<String>,
        max_attempts: Option<u32>,
    ) -> Result<TrackedDownload> {
        let mut entries = self.entries.lock().await;
        let tracked = entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        match outcome {
            ImportOutcome::Success => {
                tracked.transition_to(TrackedDownloadState::Imported)?;
                tracked.status_messages.clear();
            }
            ImportOutcome::Failure => {
                let exhausted = max_attempts.is_some_and(|max| tracked.import_attempts >= max);
                let next = if exhausted {
                    TrackedDownloadState::ImportFailed
                } else {
                    TrackedDownloadState::ImportPending
                };
                tracked.transition_to(next)?;
                tracked.status_messages = messages;
            }
        }

        Ok(tracked.clone())
    }

    /// Drop downloads a reachable client stopped reporting
    ///
    /// Only entries owned by a client in `polled_clients` are considered, so items of
    /// a client that was unreachable this cycle are kept. Entries with an import in
    /// flight are always kept. Returns the removed entries.
    pub async fn prune_missing(
        &self,
        polled_clients: &HashSet<ClientId>,
        seen: &HashSet<DownloadId>,
    ) -> Vec<TrackedDownload> {
        let mut entries = self.entries.lock().await;

        let doomed: Vec<DownloadId> = entries
            .iter()
            .filter(|(id, tracked)| {
                polled_clients.contains(&tracked.download_item.client_id)
                    && !seen.contains(*id)
                    && tracked.state != TrackedDownloadState::Importing
            })
            .map(|(id, _)| id.clone())
            .collect();

        doomed
            .iter()
            .filter_map(|id| entries.remove(id))
            .collect()
    }
}

fn claim(tracked: &mut TrackedDownload) -> Result<TrackedDownload> {
    tracked.transition_to(TrackedDownloadState::Importing)?;
    tracked.import_attempts += 1;
    Ok(tracked.clone())
}
