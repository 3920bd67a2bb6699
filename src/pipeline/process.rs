//! Gating, import attempt and state transition for one tracked download.

use crate::error::{Error, Result};
use crate::gating::{self, BlockReason, Eligibility};
use crate::import::{self, ImportOutcome};
use crate::tracking::{ImportClaim, TrackedDownload, TrackedDownloadState};
use crate::types::{DownloadClientItem, DownloadId, Event, HistoryRecord, ImportResult};
use tracing::{debug, info, warn};

use super::ImportPipeline;

/// What happened when a tracked download was processed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Gating refused the attempt; nothing changed
    Blocked(BlockReason),
    /// Another attempt for the same download is already running
    InFlight,
    /// Every file was imported
    Imported,
    /// The attempt failed; the download will be retried next cycle
    ImportPending,
    /// The attempt failed and no attempts are left
    ImportFailed,
}

impl ImportPipeline {
    /// Evaluate one tracked download and import it if it is eligible
    ///
    /// At most one attempt per download ID runs at a time: a concurrent call for a
    /// download that is already importing returns [`ProcessOutcome::InFlight`]
    /// without touching the import service. Gating is checked again on the live
    /// entry when the attempt is claimed, so a download whose client reported it
    /// again as not completed while this call waited for a permit is left alone.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the download is not tracked and
    /// `Error::ShuttingDown` once shutdown has begun. Import failures are not errors;
    /// they are reported through the returned outcome.
    pub async fn process_download(&self, id: &DownloadId) -> Result<ProcessOutcome> {
        self.ensure_running()?;

        let tracked = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        let grab_history = match tracked.download_item.category() {
            Some(_) => None,
            None => self.grab_history(id).await,
        };

        if let Eligibility::Blocked(reason) =
            gating::can_import(&tracked, &self.config, grab_history.as_ref())
        {
            debug!(
                download_id = %id,
                state = %tracked.state,
                reason = %reason,
                "download not eligible for import"
            );
            return Ok(ProcessOutcome::Blocked(reason));
        }

        let _permit = self
            .import_limit
            .acquire()
            .await
            .map_err(|_| Error::ShuttingDown)?;

        // Shutdown may have started while this call waited for a permit
        self.ensure_running()?;

        let claim = self
            .registry
            .begin_import_if(id, |live| {
                gating::can_import(live, &self.config, grab_history.as_ref())
            })
            .await;

        let tracked = match claim {
            Ok(ImportClaim::Claimed(tracked)) => tracked,
            Ok(ImportClaim::Blocked(reason)) => {
                debug!(
                    download_id = %id,
                    reason = %reason,
                    "download changed while waiting for an import slot"
                );
                return Ok(ProcessOutcome::Blocked(reason));
            }
            Err(Error::InvalidTransition { from, .. }) => {
                debug!(download_id = %id, state = %from, "import already claimed");
                return Ok(match from {
                    TrackedDownloadState::Importing => ProcessOutcome::InFlight,
                    TrackedDownloadState::Imported => {
                        ProcessOutcome::Blocked(BlockReason::AlreadyImported)
                    }
                    _ => ProcessOutcome::Blocked(BlockReason::AttemptsExhausted),
                });
            }
            Err(e) => return Err(e),
        };

        info!(
            download_id = %id,
            title = %tracked.download_item.title,
            attempt = tracked.import_attempts,
            "importing completed download"
        );

        let (results, mut messages) = match self.attempt_import(&tracked).await {
            Ok(results) => {
                let messages = import::failure_messages(&results);
                (results, messages)
            }
            Err(e) => {
                warn!(
                    download_id = %id,
                    error = %e,
                    code = e.error_code(),
                    "import service failed, treating as no files imported"
                );
                (Vec::new(), vec![e.to_string()])
            }
        };

        if results.is_empty() && messages.is_empty() {
            messages.push(no_files_message(&tracked.download_item));
        }

        let outcome = import::reduce(&results);
        let updated = self
            .registry
            .finish_import(
                id,
                outcome,
                messages.clone(),
                self.config.import.max_import_attempts,
            )
            .await?;

        match outcome {
            ImportOutcome::Success => {
                info!(
                    download_id = %id,
                    files = results.len(),
                    "download imported"
                );
                self.events.publish(Event::DownloadCompleted { tracked: updated });
                Ok(ProcessOutcome::Imported)
            }
            ImportOutcome::Failure => {
                warn!(
                    download_id = %id,
                    state = %updated.state,
                    attempts = updated.import_attempts,
                    messages = ?messages,
                    "import incomplete"
                );
                self.events.publish(Event::ImportFailed {
                    download_id: id.clone(),
                    title: updated.download_item.title.clone(),
                    messages,
                });
                Ok(match updated.state {
                    TrackedDownloadState::ImportFailed => ProcessOutcome::ImportFailed,
                    _ => ProcessOutcome::ImportPending,
                })
            }
        }
    }

    /// Hand a download to the import service
    ///
    /// The download must already be in `Importing`. No retry happens here.
    pub(crate) async fn attempt_import(
        &self,
        tracked: &TrackedDownload,
    ) -> Result<Vec<ImportResult>> {
        let item = &tracked.download_item;
        let Some(path) = item.output_path() else {
            return Ok(Vec::new());
        };

        self.import_service.process_path(path, item).await
    }

    /// Most recent history record for `id`; a failed lookup counts as no history
    pub(crate) async fn grab_history(&self, id: &DownloadId) -> Option<HistoryRecord> {
        match self.history.most_recent_for_download_id(id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(download_id = %id, error = %e, "history lookup failed, assuming no history");
                None
            }
        }
    }
}

fn no_files_message(item: &DownloadClientItem) -> String {
    match item.output_path() {
        Some(path) => format!(
            "No files found are eligible for import in {}",
            path.display()
        ),
        None => "No files found are eligible for import".to_string(),
    }
}
