//! Core types for completed-import

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tracking::TrackedDownload;

/// Client-assigned download identifier (e.g. a SABnzbd `nzo_id` or torrent info-hash)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(pub String);

impl DownloadId {
    /// Create a new DownloadId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DownloadId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DownloadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Stored as TEXT in the history table
impl sqlx::Type<sqlx::Sqlite> for DownloadId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for DownloadId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for DownloadId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Identifier of a registered download client
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Create a new ClientId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of an item as reported by its download client
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadItemStatus {
    /// Waiting in the client's queue
    Queued,
    /// Actively downloading
    Downloading,
    /// Paused by the user or the client
    Paused,
    /// Downloading, but the client flagged a problem
    Warning,
    /// Download failed inside the client
    Failed,
    /// Download finished; files are in the output path
    Completed,
}

impl DownloadItemStatus {
    /// Whether the client is done with this item (successfully or not)
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadItemStatus::Completed | DownloadItemStatus::Failed)
    }
}

/// Snapshot of one item as reported by a download client during a poll
///
/// Snapshots are immutable and replaced wholesale on every poll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadClientItem {
    /// Client-assigned download identifier
    pub download_id: DownloadId,

    /// Release title as known to the client
    pub title: String,

    /// Category / label assigned in the client
    #[serde(default)]
    pub category: Option<String>,

    /// Current status
    pub status: DownloadItemStatus,

    /// Where the client put the files (None or empty = not known yet)
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// The client that owns this item
    pub client_id: ClientId,

    /// Total size in bytes
    #[serde(default)]
    pub total_size_bytes: u64,

    /// Bytes still to download
    #[serde(default)]
    pub remaining_size_bytes: u64,

    /// Free-form status message from the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DownloadClientItem {
    /// Output path, treating an empty path the same as an unset one
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Category, treating a blank string the same as an unset one
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Reference to a series in the library catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRef {
    /// Catalog series ID
    pub id: i64,
    /// Series title
    pub title: String,
}

/// Reference to an episode in the library catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRef {
    /// Catalog episode ID
    pub id: i64,
    /// Season number
    pub season_number: u32,
    /// Episode number within the season
    pub episode_number: u32,
}

/// Media identity resolved for a download (which series and episodes it contains)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    /// The series the release belongs to
    pub series: SeriesRef,
    /// The episodes contained in the release
    pub episodes: Vec<EpisodeRef>,
}

impl ResolvedMedia {
    /// Catalog IDs of all episodes
    pub fn episode_ids(&self) -> Vec<i64> {
        self.episodes.iter().map(|e| e.id).collect()
    }
}

/// Per-file judgment produced by the import engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecision {
    /// Local file the decision applies to
    pub local_path: PathBuf,
    /// Rejection reasons (empty = approved)
    #[serde(default)]
    pub rejections: Vec<String>,
}

impl ImportDecision {
    /// An approved decision for a file
    pub fn approved(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            rejections: Vec::new(),
        }
    }

    /// A decision rejected for the given reason
    pub fn rejected(local_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            rejections: vec![reason.into()],
        }
    }

    /// Whether the engine approved this file
    pub fn is_approved(&self) -> bool {
        self.rejections.is_empty()
    }
}

/// Outcome of importing one file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// The decision the engine acted on
    pub decision: ImportDecision,
    /// Failure or skip message, if the file was not imported
    #[serde(default)]
    pub failure: Option<String>,
}

impl ImportResult {
    /// Result for a file that was processed without a failure message
    pub fn new(decision: ImportDecision) -> Self {
        Self {
            decision,
            failure: None,
        }
    }

    /// Result for a file that failed or was skipped
    pub fn failed(decision: ImportDecision, message: impl Into<String>) -> Self {
        Self {
            decision,
            failure: Some(message.into()),
        }
    }

    /// Approved and no failure message
    pub fn is_success(&self) -> bool {
        self.decision.is_approved() && self.failure.is_none()
    }

    /// Human-readable reasons this result is not a success
    pub fn messages(&self) -> Vec<String> {
        let mut messages = self.decision.rejections.clone();
        if let Some(failure) = &self.failure {
            messages.push(failure.clone());
        }
        messages
    }
}

/// Kind of history event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventType {
    /// A release was sent to a download client
    Grabbed,
    /// A completed download was imported into the library
    DownloadImported,
}

impl HistoryEventType {
    /// Convert integer code to HistoryEventType
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(HistoryEventType::Grabbed),
            3 => Some(HistoryEventType::DownloadImported),
            _ => None,
        }
    }

    /// Convert HistoryEventType to its integer code
    pub fn to_i32(&self) -> i32 {
        match self {
            HistoryEventType::Grabbed => 1,
            HistoryEventType::DownloadImported => 3,
        }
    }
}

/// Evidence of something that happened to a download, addressable by download ID
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Unique database ID
    pub id: i64,
    /// Client-assigned download identifier
    pub download_id: DownloadId,
    /// What happened
    pub event_type: HistoryEventType,
    /// Release title at the time of the event
    pub source_title: String,
    /// Catalog series, if known
    pub series_id: Option<i64>,
    /// Catalog episodes, if known
    pub episode_ids: Vec<i64>,
    /// When it happened
    pub date: DateTime<Utc>,
}

/// Event published on the pipeline bus
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A completed download was fully imported
    ///
    /// Published exactly once per successful import.
    DownloadCompleted {
        /// The tracked download, already in the `Imported` state
        tracked: TrackedDownload,
    },

    /// An import attempt did not import every file
    ImportFailed {
        /// Download ID
        download_id: DownloadId,
        /// Release title
        title: String,
        /// Per-file rejection and failure messages
        messages: Vec<String>,
    },

    /// A download client could not be polled this cycle
    ClientUnavailable {
        /// Client ID
        client_id: ClientId,
        /// Error message
        error: String,
    },
}
