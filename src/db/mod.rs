//! Database layer for completed-import
//!
//! Handles SQLite persistence of download history: which releases the application
//! grabbed and which downloads were imported.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`history`] - History records keyed by download ID

use crate::error::{DatabaseError, Error, Result};
use crate::types::{DownloadId, HistoryEventType, HistoryRecord};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod history;
mod migrations;

/// New history record to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
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

/// History record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    /// Unique database ID
    pub id: i64,
    /// Client-assigned download identifier
    pub download_id: DownloadId,
    /// Event type code (see [`HistoryEventType::to_i32`])
    pub event_type: i32,
    /// Release title
    pub source_title: String,
    /// Catalog series ID
    pub series_id: Option<i64>,
    /// Episode IDs as a JSON array
    pub episode_ids: String,
    /// Unix timestamp of the event
    pub date: i64,
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = Error;

    fn try_from(row: HistoryRow) -> Result<Self> {
        let event_type = HistoryEventType::from_i32(row.event_type).ok_or_else(|| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "history row {} has unknown event type {}",
                row.id, row.event_type
            )))
        })?;

        Ok(HistoryRecord {
            id: row.id,
            download_id: row.download_id,
            event_type,
            source_title: row.source_title,
            series_id: row.series_id,
            episode_ids: serde_json::from_str(&row.episode_ids)?,
            date: Utc
                .timestamp_opt(row.date, 0)
                .single()
                .unwrap_or_else(Utc::now),
        })
    }
}

/// Database handle for completed-import
pub struct Database {
    pool: SqlitePool,
}
