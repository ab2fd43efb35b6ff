//! Mock analyzer for tests and offline development
//!
//! Returns canned responses keyed by agent, with optional injected failures
//! and latency. Recorded requests can be inspected by tests.

use crate::analyzer::{AnalysisRequest, AnalysisResponse, Analyzer};
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock analyzer that returns canned responses keyed by agent.
pub struct MockAnalyzer {
    responses: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
    /// Remaining failures to inject per agent (`u32::MAX` = always fail)
    failures: Arc<Mutex<HashMap<String, u32>>>,
    calls: Arc<Mutex<Vec<AnalysisRequest>>>,
    delay: Option<Duration>,
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalyzer {
    /// Create a new mock analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Add artificial latency to every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a canned response for an agent.
    pub fn add_response(&self, agent: impl Into<String>, content: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(agent.into())
            .or_default()
            .push_back(content.into());
    }

    /// Make the next `count` calls for an agent fail with a transient error.
    pub fn fail_next(&self, agent: impl Into<String>, count: u32) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(agent.into(), count);
    }

    /// Make every call for an agent fail with a transient error.
    pub fn fail_always(&self, agent: impl Into<String>) {
        self.fail_next(agent, u32::MAX);
    }

    /// Requests received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<AnalysisRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls received for a given agent.
    #[must_use]
    pub fn call_count(&self, agent: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.agent == agent)
            .count()
    }
}

#[async_trait::async_trait]
impl Analyzer for MockAnalyzer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let agent = request.agent.clone();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        {
            let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(remaining) = failures.get_mut(&agent) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(Error::Api(format!("injected failure for {agent}")));
                }
            }
        }

        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        let content = responses
            .get_mut(&agent)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| format!("mock analysis from {agent}"));

        Ok(AnalysisResponse {
            content,
            model: Some("mock-model".to_string()),
        })
    }
}
