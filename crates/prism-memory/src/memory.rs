//! In-memory store backend
//!
//! Process-local implementation of [`MemoryStore`] for development and
//! tests. Data is lost on restart; use `SqliteStore` for persistence.

use crate::error::Result;
use crate::store::{MemoryStore, DEFAULT_DUPLICATE_WINDOW};
use crate::types::{ConversationEntry, StoreStats};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory conversation store (for development/testing).
pub struct InMemoryStore {
    threads: Arc<RwLock<HashMap<String, Vec<ConversationEntry>>>>,
    duplicate_window: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
        }
    }

    /// Set the duplicate-detection window.
    #[must_use]
    pub fn with_duplicate_window(mut self, window: usize) -> Self {
        self.duplicate_window = window;
        self
    }

    /// Sort most recent first, ties broken by entry id.
    fn sort_recent_first(entries: &mut [ConversationEntry]) {
        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn append(&self, mut entry: ConversationEntry) -> Result<ConversationEntry> {
        let mut threads = self.threads.write().await;
        let thread = threads.entry(entry.thread_id.clone()).or_default();

        if let Some(existing) = thread.iter().find(|e| e.entry_id == entry.entry_id) {
            debug!(entry_id = %entry.entry_id, "Duplicate append ignored");
            return Ok(existing.clone());
        }

        let fingerprint = entry.fingerprint();
        let mut recent: Vec<ConversationEntry> = thread.clone();
        Self::sort_recent_first(&mut recent);
        entry.duplicate = recent
            .iter()
            .take(self.duplicate_window)
            .any(|e| e.fingerprint() == fingerprint);

        thread.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, thread_id: &str, limit: usize) -> Result<Vec<ConversationEntry>> {
        let threads = self.threads.read().await;
        let mut entries = threads.get(thread_id).cloned().unwrap_or_default();
        Self::sort_recent_first(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn search(
        &self,
        thread_id: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ConversationEntry>> {
        let needle = text.to_lowercase();
        let threads = self.threads.read().await;
        let mut matches: Vec<ConversationEntry> = threads
            .get(thread_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| {
                        e.user_query.to_lowercase().contains(&needle)
                            || e.final_answer.to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Self::sort_recent_first(&mut matches);
        matches.truncate(limit);
        Ok(matches)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<u64> {
        let mut threads = self.threads.write().await;
        let count = threads.remove(thread_id).map(|v| v.len()).unwrap_or(0);
        Ok(count as u64)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let threads = self.threads.read().await;
        let total: usize = threads.values().map(Vec::len).sum();
        let last_updated = threads
            .values()
            .flat_map(|entries| entries.iter().map(|e| e.timestamp))
            .max();
        Ok(StoreStats {
            total_entries: total as u64,
            thread_count: threads.values().filter(|v| !v.is_empty()).count() as u64,
            last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QueryKind, RouteDecision};
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;

    fn entry(thread_id: &str, entry_id: &str, answer: &str) -> ConversationEntry {
        ConversationEntry {
            entry_id: entry_id.to_string(),
            thread_id: thread_id.to_string(),
            timestamp: Utc::now(),
            user_query: "query".to_string(),
            query_kind: QueryKind::General,
            is_followup: false,
            processing_time_ms: 1,
            specialist_outputs: BTreeMap::new(),
            moderator_output: Some("moderated".to_string()),
            final_answer: answer.to_string(),
            route_decision: RouteDecision::FullPipeline,
            duplicate: false,
        }
    }

    #[tokio::test]
    async fn test_append_list_delete_roundtrip() {
        let store = InMemoryStore::new();

        let mut first = entry("t1", "e1", "one");
        first.timestamp = Utc::now() - Duration::seconds(1);
        store.append(first).await.unwrap();
        store.append(entry("t1", "e2", "two")).await.unwrap();

        let listed = store.list("t1", 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].entry_id, "e2");

        assert_eq!(store.delete_thread("t1").await.unwrap(), 2);
        assert!(store.list("t1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_append() {
        let store = InMemoryStore::new();
        store.append(entry("t1", "e1", "original")).await.unwrap();
        let stored = store.append(entry("t1", "e1", "replayed")).await.unwrap();
        assert_eq!(stored.final_answer, "original");
        assert_eq!(store.list("t1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_tagging() {
        let store = InMemoryStore::new();
        let mut first = entry("t1", "e1", "Same Answer");
        first.timestamp = Utc::now() - Duration::seconds(1);
        store.append(first).await.unwrap();

        let stored = store.append(entry("t1", "e2", "same   answer")).await.unwrap();
        assert!(stored.duplicate);
    }

    #[tokio::test]
    async fn test_search_and_stats() {
        let store = InMemoryStore::new();
        store.append(entry("t1", "e1", "tiered pricing")).await.unwrap();
        store.append(entry("t2", "e2", "other")).await.unwrap();

        let results = store.search("t1", "PRICING", 10).await.unwrap();
        assert_eq!(results.len(), 1);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.thread_count, 2);
        assert!(stats.last_updated.is_some());
    }
}
