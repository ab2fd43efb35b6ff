//! Analyzer request/response types and the provider trait
//!
//! An analyzer maps a fully rendered prompt to an analysis text. The engine
//! renders role instructions, the user query and the conversation context
//! into the prompt; the analyzer only transports it.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A single analysis request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Logical agent issuing the request ("domain_expert", "moderator", ...).
    /// Used for logging and for keying mock responses; never sent upstream.
    pub agent: String,
    /// Fully rendered prompt.
    pub prompt: String,
    /// Sampling temperature, if the provider supports it.
    pub temperature: Option<f32>,
    /// Generation cap, if the provider supports it.
    pub max_tokens: Option<u32>,
}

impl AnalysisRequest {
    /// Create a request for the given agent.
    #[must_use]
    pub fn new(agent: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generation cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Analysis response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Generated analysis text.
    pub content: String,
    /// Model that produced it, when reported by the provider.
    pub model: Option<String>,
}

/// Trait for analyzer providers
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Run one analysis
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse>;
}
