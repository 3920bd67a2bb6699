//! One poll cycle: gateway, registry merge, media resolution, imports.

use crate::config::RemovalPolicy;
use crate::error::{Error, Result};
use crate::tracking::TrackedDownload;
use crate::types::{DownloadId, Event};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{ImportPipeline, ProcessOutcome};

/// Counts describing one poll cycle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Clients that answered
    pub clients_polled: usize,
    /// Clients that could not be reached
    pub clients_unavailable: usize,
    /// Downloads reported this cycle
    pub seen: usize,
    /// Downloads dropped by the removal policy
    pub pruned: usize,
    /// Downloads that got resolved media this cycle
    pub resolved: usize,
    /// Downloads gating left alone
    pub blocked: usize,
    /// Downloads skipped because an attempt was already running
    pub in_flight: usize,
    /// Downloads imported this cycle
    pub imported: usize,
    /// Failed attempts that will be retried
    pub pending: usize,
    /// Failed attempts with no attempts left
    pub failed: usize,
    /// Downloads whose processing returned an error
    pub errors: usize,
}

impl PollSummary {
    fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Blocked(_) => self.blocked += 1,
            ProcessOutcome::InFlight => self.in_flight += 1,
            ProcessOutcome::Imported => self.imported += 1,
            ProcessOutcome::ImportPending => self.pending += 1,
            ProcessOutcome::ImportFailed => self.failed += 1,
        }
    }
}

impl ImportPipeline {
    /// Run one poll cycle
    ///
    /// Polls every client concurrently, merges the combined snapshot into the
    /// registry in one step, applies the removal policy, resolves media for
    /// downloads that have none, then processes every download reported this cycle.
    /// Imports of distinct downloads run concurrently, bounded by
    /// `max_concurrent_imports`.
    ///
    /// An unreachable client is not an error: its items are skipped this cycle and a
    /// `ClientUnavailable` event is published.
    pub async fn poll_once(&self) -> Result<PollSummary> {
        self.ensure_running()?;

        let poll = self.gateway.poll(&self.config).await;

        let mut summary = PollSummary {
            clients_polled: poll.polled.len(),
            clients_unavailable: poll.unavailable.len(),
            seen: poll.items.len(),
            ..PollSummary::default()
        };

        for (client_id, error) in &poll.unavailable {
            self.events.publish(Event::ClientUnavailable {
                client_id: client_id.clone(),
                error: error.to_string(),
            });
        }

        let seen: HashSet<DownloadId> = poll
            .items
            .iter()
            .map(|item| item.download_id.clone())
            .collect();
        let merged = self.registry.merge(poll.items).await;

        if self.config.import.removal_policy == RemovalPolicy::ForgetMissing {
            let removed = self.registry.prune_missing(&poll.polled, &seen).await;
            for tracked in &removed {
                info!(
                    download_id = %tracked.download_id(),
                    state = %tracked.state,
                    "download no longer reported by its client, forgetting it"
                );
            }
            summary.pruned = removed.len();
        }

        summary.resolved = self.resolve_media(&merged).await;

        let outcomes = futures::future::join_all(
            merged
                .iter()
                .map(|tracked| self.process_download(tracked.download_id())),
        )
        .await;

        for (tracked, outcome) in merged.iter().zip(outcomes) {
            match outcome {
                Ok(outcome) => summary.record(&outcome),
                Err(Error::ShuttingDown) => {}
                Err(e) => {
                    warn!(
                        download_id = %tracked.download_id(),
                        error = %e,
                        code = e.error_code(),
                        "failed to process download"
                    );
                    summary.errors += 1;
                }
            }
        }

        debug!(
            clients_polled = summary.clients_polled,
            clients_unavailable = summary.clients_unavailable,
            seen = summary.seen,
            imported = summary.imported,
            pending = summary.pending,
            blocked = summary.blocked,
            "poll cycle complete"
        );

        Ok(summary)
    }

    /// Ask the resolver about downloads that have no media yet
    ///
    /// Returns the number of downloads that got media attached.
    async fn resolve_media(&self, merged: &[TrackedDownload]) -> usize {
        let Some(resolver) = self.resolver.as_ref() else {
            return 0;
        };

        let unresolved: Vec<&TrackedDownload> = merged
            .iter()
            .filter(|t| t.resolved_media.is_none())
            .collect();

        let attached = futures::future::join_all(unresolved.into_iter().map(|tracked| async move {
            let id = tracked.download_id();
            let history = self.grab_history(id).await;

            match resolver.resolve(&tracked.download_item, history.as_ref()).await {
                Ok(Some(media)) => match self.registry.attach_media(id, media).await {
                    Ok(attached) => attached,
                    Err(e) => {
                        warn!(download_id = %id, error = %e, "failed to attach resolved media");
                        false
                    }
                },
                Ok(None) => {
                    debug!(download_id = %id, "media not resolved yet");
                    false
                }
                Err(e) => {
                    warn!(download_id = %id, error = %e, "media resolution failed, retrying next cycle");
                    false
                }
            }
        }))
        .await;

        attached.into_iter().filter(|a| *a).count()
    }
}
