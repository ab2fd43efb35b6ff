//! Orchestrator configuration

use crate::retry::RetryConfig;
use std::time::Duration;

/// Size of the per-request event buffer.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Tunables for the orchestration engine.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How many prior entries feed prompt context (K)
    pub history_context_limit: usize,
    /// Per-analyzer-call deadline
    pub analyzer_timeout: Duration,
    /// Whole-request deadline
    pub request_timeout: Duration,
    /// Retry policy for analyzer calls
    pub retry: RetryConfig,
    /// Bound of the per-request event queue
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_context_limit: 10,
            analyzer_timeout: Duration::from_secs(45),
            request_timeout: Duration::from_secs(180),
            retry: RetryConfig::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl OrchestratorConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the history context limit.
    #[must_use]
    pub fn with_history_context_limit(mut self, limit: usize) -> Self {
        self.history_context_limit = limit;
        self
    }

    /// Set the per-call deadline.
    #[must_use]
    pub fn with_analyzer_timeout(mut self, timeout: Duration) -> Self {
        self.analyzer_timeout = timeout;
        self
    }

    /// Set the whole-request deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
