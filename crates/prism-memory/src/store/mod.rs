//! MemoryStore trait and the SQLite-backed implementation.

use crate::error::{Error, Result};
use crate::types::{ConversationEntry, StoreStats};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

mod crud;
mod migrations;


/// Default size of the write-side duplicate-detection window.
pub const DEFAULT_DUPLICATE_WINDOW: usize = 5;

/// Append-only conversation memory keyed by thread.
///
/// `append` MUST be idempotent on `entry_id` and atomic per entry. Readers
/// receive owned copies; stored entries are immutable apart from bulk
/// deletion by thread.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Durably persist a single entry. Duplicate `entry_id` appends are
    /// silently ignored. Returns the stored entry, with the `duplicate` tag
    /// applied when the normalized answer repeats a recent one in the thread.
    async fn append(&self, entry: ConversationEntry) -> Result<ConversationEntry>;

    /// Entries of a thread, most recent first, up to `limit`.
    async fn list(&self, thread_id: &str, limit: usize) -> Result<Vec<ConversationEntry>>;

    /// Case-insensitive substring search over query and final answer,
    /// most recent first, ties broken by entry id.
    async fn search(&self, thread_id: &str, text: &str, limit: usize)
        -> Result<Vec<ConversationEntry>>;

    /// Delete every entry of a thread. Returns the number removed.
    async fn delete_thread(&self, thread_id: &str) -> Result<u64>;

    /// Aggregate statistics.
    async fn stats(&self) -> Result<StoreStats>;
}

/// SQLite-backed memory store.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
    pub(crate) duplicate_window: usize,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub async fn from_path(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        // Enable WAL for read/write concurrency
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        let store = Self {
            pool,
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
        };
        store.run_migrations().await?;
        info!("Memory store initialized at {}", db_path.display());
        Ok(store)
    }

    /// In-memory SQLite store (for tests).
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self {
            pool,
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
        };
        store.run_migrations().await?;
        debug!("In-memory SQLite memory store initialized");
        Ok(store)
    }

    /// Set the duplicate-detection window.
    #[must_use]
    pub fn with_duplicate_window(mut self, window: usize) -> Self {
        self.duplicate_window = window;
        self
    }

    /// Parse a store URI of the form `sqlite:<path>` or `memory:` and open
    /// the corresponding store.
    pub async fn from_uri(uri: &str) -> Result<Self> {
        if uri == "memory:" || uri == "sqlite::memory:" {
            return Self::in_memory().await;
        }
        match uri.strip_prefix("sqlite:") {
            Some(path) => Self::from_path(std::path::Path::new(path)).await,
            None => Err(Error::Internal(format!("unsupported store uri: {uri}"))),
        }
    }
}
