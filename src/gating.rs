//! Import eligibility rules
//!
//! [`can_import`] decides whether a tracked download may be imported right now. It is
//! a pure function: the only outside knowledge it needs, the grab history for
//! the download, is looked up by the caller and passed in.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. The client has not finished the download → [`BlockReason::NotCompleted`]
//! 2. The client reported no output path → [`BlockReason::NoOutputPath`]
//! 3. The output sits directly in the intake folder → [`BlockReason::HandledByIntakeScanner`]
//! 4. No category and no grab history → [`BlockReason::UntrackedNoCategory`]
//! 5. Already imported → [`BlockReason::AlreadyImported`]
//! 6. Attempts exhausted → [`BlockReason::AttemptsExhausted`]

use crate::config::Config;
use crate::tracking::{TrackedDownload, TrackedDownloadState};
use crate::types::{DownloadItemStatus, HistoryRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Why a download may not be imported right now
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Client status is not `Completed`
    NotCompleted,
    /// Client did not report where the files are
    NoOutputPath,
    /// Output is directly inside the intake folder; the folder scanner owns it
    HandledByIntakeScanner,
    /// No category and no record of the application grabbing it
    UntrackedNoCategory,
    /// Already imported
    AlreadyImported,
    /// Import attempts exhausted; waits for the client to re-queue it
    AttemptsExhausted,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            BlockReason::NotCompleted => "download is not completed",
            BlockReason::NoOutputPath => "download client reported no output path",
            BlockReason::HandledByIntakeScanner => {
                "output is in the intake folder and handled by the folder scanner"
            }
            BlockReason::UntrackedNoCategory => {
                "download has no category and was not grabbed by this application"
            }
            BlockReason::AlreadyImported => "download was already imported",
            BlockReason::AttemptsExhausted => "import attempts exhausted",
        };
        f.write_str(reason)
    }
}

/// Verdict of [`can_import`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    /// The download may be imported now
    Eligible,
    /// The download must be left alone this cycle
    Blocked(BlockReason),
}

impl Eligibility {
    /// Whether the verdict allows an import attempt
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Decide whether `tracked` may be imported now
///
/// `grab_history` is the most recent history record for the download's ID. It is
/// only consulted when the download has no category, so callers may skip the
/// lookup (and pass `None`) when a category is present.
pub fn can_import(
    tracked: &TrackedDownload,
    config: &Config,
    grab_history: Option<&HistoryRecord>,
) -> Eligibility {
    let item = &tracked.download_item;

    if item.status != DownloadItemStatus::Completed {
        return Eligibility::Blocked(BlockReason::NotCompleted);
    }

    let Some(output_path) = item.output_path() else {
        return Eligibility::Blocked(BlockReason::NoOutputPath);
    };

    if let Some(intake) = config.intake_folder()
        && is_in_intake_root(output_path, intake)
    {
        return Eligibility::Blocked(BlockReason::HandledByIntakeScanner);
    }

    if item.category().is_none() && grab_history.is_none() {
        return Eligibility::Blocked(BlockReason::UntrackedNoCategory);
    }

    match tracked.state {
        TrackedDownloadState::Imported => Eligibility::Blocked(BlockReason::AlreadyImported),
        TrackedDownloadState::ImportFailed => {
            Eligibility::Blocked(BlockReason::AttemptsExhausted)
        }
        _ => Eligibility::Eligible,
    }
}

/// True when `output` is the intake folder itself or a direct child of it
///
/// `Path` equality compares components, so trailing separators do not matter.
fn is_in_intake_root(output: &Path, intake: &Path) -> bool {
    output == intake || output.parent() == Some(intake)
}
