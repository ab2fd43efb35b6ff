use super::SqliteStore;
use crate::error::Result;

impl SqliteStore {
    // ── Migrations ──────────────────────────────────────────────

    pub(crate) async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entries (
                entry_id    TEXT PRIMARY KEY,
                thread_id   TEXT NOT NULL,
                user_query  TEXT NOT NULL,
                response    TEXT NOT NULL,
                context     TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                duplicate   INTEGER NOT NULL DEFAULT 0,
                timestamp   TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entries_thread
             ON entries(thread_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entries_fingerprint
             ON entries(thread_id, fingerprint)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
