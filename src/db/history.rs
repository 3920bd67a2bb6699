//! History record operations.

use crate::error::DatabaseError;
use crate::types::{DownloadId, HistoryRecord};
use crate::{Error, Result};

use super::{Database, HistoryRow, NewHistoryRecord};

impl Database {
    /// Insert a history record, returning its database ID
    pub async fn insert_history(&self, record: &NewHistoryRecord) -> Result<i64> {
        let episode_ids = serde_json::to_string(&record.episode_ids)?;

        let result = sqlx::query(
            r#"
            INSERT INTO history (
                download_id, event_type, source_title, series_id, episode_ids, date
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.download_id)
        .bind(record.event_type.to_i32())
        .bind(&record.source_title)
        .bind(record.series_id)
        .bind(episode_ids)
        .bind(record.date.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert history record: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent history record for a download ID
    ///
    /// Ties on date are broken by insertion order.
    pub async fn most_recent_for_download_id(
        &self,
        download_id: &DownloadId,
    ) -> Result<Option<HistoryRecord>> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, download_id, event_type, source_title, series_id, episode_ids, date
            FROM history
            WHERE download_id = ?
            ORDER BY date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(download_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to query history: {}",
                e
            )))
        })?;

        row.map(HistoryRecord::try_from).transpose()
    }

    /// All history records for a download ID, newest first
    pub async fn history_for_download_id(
        &self,
        download_id: &DownloadId,
    ) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, download_id, event_type, source_title, series_id, episode_ids, date
            FROM history
            WHERE download_id = ?
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(download_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to query history: {}",
                e
            )))
        })?;

        rows.into_iter().map(HistoryRecord::try_from).collect()
    }

    /// Total number of history records
    pub async fn count_history(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count history: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}
