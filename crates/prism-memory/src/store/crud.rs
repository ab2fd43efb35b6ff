use super::{MemoryStore, SqliteStore};
use crate::error::Result;
use crate::types::{ConversationEntry, EntryContext, StoreStats};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;

/// Escape LIKE wildcards in a user-supplied needle.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl SqliteStore {
    /// Fingerprints of the most recent `window` entries of a thread.
    async fn recent_fingerprints(&self, thread_id: &str, window: usize) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT fingerprint FROM entries
             WHERE thread_id = ?1
             ORDER BY timestamp DESC, entry_id ASC
             LIMIT ?2",
        )
        .bind(thread_id)
        .bind(window as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("fingerprint")).collect())
    }

    pub(crate) fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationEntry> {
        let context_json: String = row.try_get("context")?;
        let context: EntryContext = serde_json::from_str(&context_json)?;
        let timestamp_str: String = row.try_get("timestamp")?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(ConversationEntry::from_storage(
            row.try_get("entry_id")?,
            row.try_get("thread_id")?,
            timestamp,
            row.try_get("user_query")?,
            row.try_get("response")?,
            context,
            row.try_get::<i64, _>("duplicate")? != 0,
        ))
    }
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn append(&self, mut entry: ConversationEntry) -> Result<ConversationEntry> {
        // Idempotency on entry_id: a replayed append returns the stored row.
        let existing = sqlx::query(
            "SELECT entry_id, thread_id, user_query, response, context, duplicate, timestamp
             FROM entries WHERE entry_id = ?1",
        )
        .bind(&entry.entry_id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = existing {
            debug!(entry_id = %entry.entry_id, "Duplicate append ignored");
            return Self::row_to_entry(&row);
        }

        let fingerprint = entry.fingerprint();
        let recent = self
            .recent_fingerprints(&entry.thread_id, self.duplicate_window)
            .await?;
        entry.duplicate = recent.contains(&fingerprint);

        let context = serde_json::to_string(&EntryContext::from(&entry))?;
        sqlx::query(
            "INSERT OR IGNORE INTO entries
             (entry_id, thread_id, user_query, response, context, fingerprint, duplicate, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&entry.entry_id)
        .bind(&entry.thread_id)
        .bind(&entry.user_query)
        .bind(&entry.final_answer)
        .bind(&context)
        .bind(&fingerprint)
        .bind(entry.duplicate as i64)
        .bind(entry.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            entry_id = %entry.entry_id,
            thread_id = %entry.thread_id,
            duplicate = entry.duplicate,
            "Entry appended"
        );
        Ok(entry)
    }

    async fn list(&self, thread_id: &str, limit: usize) -> Result<Vec<ConversationEntry>> {
        let rows = sqlx::query(
            "SELECT entry_id, thread_id, user_query, response, context, duplicate, timestamp
             FROM entries WHERE thread_id = ?1
             ORDER BY timestamp DESC, entry_id ASC
             LIMIT ?2",
        )
        .bind(thread_id)
        .bind(limit.min(i64::MAX as usize) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn search(
        &self,
        thread_id: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ConversationEntry>> {
        let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
        let rows = sqlx::query(
            "SELECT entry_id, thread_id, user_query, response, context, duplicate, timestamp
             FROM entries
             WHERE thread_id = ?1
               AND (LOWER(user_query) LIKE ?2 ESCAPE '\\'
                    OR LOWER(response) LIKE ?2 ESCAPE '\\')
             ORDER BY timestamp DESC, entry_id ASC
             LIMIT ?3",
        )
        .bind(thread_id)
        .bind(&pattern)
        .bind(limit.min(i64::MAX as usize) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM entries WHERE thread_id = ?1")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        debug!(thread_id = %thread_id, count = result.rows_affected(), "Thread cleared");
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COUNT(DISTINCT thread_id) AS threads,
                    MAX(timestamp) AS last_updated
             FROM entries",
        )
        .fetch_one(&self.pool)
        .await?;

        let last_updated: Option<String> = row.try_get("last_updated")?;
        Ok(StoreStats {
            total_entries: row.try_get::<i64, _>("total")? as u64,
            thread_count: row.try_get::<i64, _>("threads")? as u64,
            last_updated: last_updated.and_then(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            }),
        })
    }
}
