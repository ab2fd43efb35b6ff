//! Orchestrator core structure
//!
//! Contains the main `Orchestrator` struct, its builder methods and the
//! memory-facing operations. The execution driver lives in `run.rs`.

use crate::config::OrchestratorConfig;
use crate::error::Result;
use dashmap::DashMap;
use prism_llm::Analyzer;
use prism_memory::{ConversationEntry, MemoryStore, StoreStats};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Main orchestrator that coordinates refinement runs.
pub struct Orchestrator {
    pub(crate) analyzer: Arc<dyn Analyzer>,
    pub(crate) store: Arc<dyn MemoryStore>,
    pub(crate) config: OrchestratorConfig,
    /// Active runs with cancellation tokens
    pub(crate) active_runs: Arc<DashMap<Uuid, CancellationToken>>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(analyzer: Arc<dyn Analyzer>, store: Arc<dyn MemoryStore>) -> Self {
        Self {
            analyzer,
            store,
            config: OrchestratorConfig::default(),
            active_runs: Arc::new(DashMap::new()),
        }
    }

    /// Set the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Name of the backing analyzer provider.
    #[must_use]
    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    /// Number of runs currently in flight.
    #[must_use]
    pub fn active_run_count(&self) -> usize {
        self.active_runs.len()
    }

    /// Cancel an active run by ID. Returns false when the run is unknown or
    /// already finished.
    pub fn cancel_run(&self, run_id: Uuid) -> bool {
        if let Some((_id, token)) = self.active_runs.remove(&run_id) {
            token.cancel();
            info!(run_id = %run_id, "Run cancelled");
            true
        } else {
            false
        }
    }

    /// Cancel every active run (used on shutdown). Returns how many were
    /// signalled.
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        self.active_runs.retain(|run_id, token| {
            token.cancel();
            info!(run_id = %run_id, "Run cancelled on shutdown");
            count += 1;
            false
        });
        count
    }

    /// Entries of a thread, most recent first.
    pub async fn history(&self, thread_id: &str, limit: usize) -> Result<Vec<ConversationEntry>> {
        Ok(self.store.list(thread_id, limit).await?)
    }

    /// Substring search within a thread.
    pub async fn search(
        &self,
        thread_id: &str,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<ConversationEntry>> {
        Ok(self.store.search(thread_id, query_text, limit).await?)
    }

    /// Delete a thread's entries. Returns the number removed.
    pub async fn clear(&self, thread_id: &str) -> Result<u64> {
        Ok(self.store.delete_thread(thread_id).await?)
    }

    /// Aggregate memory statistics.
    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats().await?)
    }
}
