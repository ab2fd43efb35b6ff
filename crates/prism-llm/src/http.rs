//! HTTP analyzer - OpenAI-compatible chat-completions provider
//!
//! Talks to any endpoint implementing the `/chat/completions` contract.
//! The endpoint URL and API key come from configuration; the engine never
//! hardcodes a vendor.

use crate::analyzer::{AnalysisRequest, AnalysisResponse, Analyzer};
use crate::error::{Error, Result};
use crate::util::mask_api_key;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// Default model name sent to the endpoint
pub const DEFAULT_MODEL: &str = "default";

/// HTTP analyzer configuration
#[derive(Clone)]
pub struct HttpAnalyzerConfig {
    /// Base URL of the chat-completions endpoint
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Model to request
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
}

// Custom Debug implementation to mask the API key
impl fmt::Debug for HttpAnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAnalyzerConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpAnalyzerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("PRISM_ANALYZER_ENDPOINT")
            .map_err(|_| Error::NotConfigured("PRISM_ANALYZER_ENDPOINT not set".to_string()))?;
        let api_key = std::env::var("PRISM_ANALYZER_API_KEY")
            .map_err(|_| Error::NotConfigured("PRISM_ANALYZER_API_KEY not set".to_string()))?;
        let model = std::env::var("PRISM_ANALYZER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            endpoint,
            api_key,
            model,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Sanitize API error messages before they reach logs or clients
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        return "API authentication error. Please check the analyzer API key.".to_string();
    }

    if lower.contains("rate limit") || lower.contains("quota") {
        return "Analyzer rate limit exceeded. Please try again later.".to_string();
    }

    if lower.contains("internal") || lower.contains("server error") {
        return "Analyzer server error. Please try again later.".to_string();
    }

    if error.len() > 300 {
        let mut end = 300;
        while !error.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...(truncated)", &error[..end])
    } else {
        error.to_string()
    }
}

/// OpenAI-compatible HTTP analyzer
pub struct HttpAnalyzer {
    client: Client,
    config: HttpAnalyzerConfig,
}

// Chat-completions wire types
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl HttpAnalyzer {
    /// Create a new HTTP analyzer
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: HttpAnalyzerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let config = HttpAnalyzerConfig::from_env()?;
        Self::new(config)
    }
}

#[async_trait::async_trait]
impl Analyzer for HttpAnalyzer {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(agent = %request.agent, model = %self.config.model))]
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse> {
        let chat_request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!("Sending analysis request");

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.endpoint.trim_end_matches('/')
            ))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Network(sanitize_api_error(&e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Api(sanitize_api_error(&error_text)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let choice = chat_response
            .choices
            .first()
            .ok_or_else(|| Error::InvalidResponse("No choices in response".to_string()))?;

        let content = choice.message.content.clone().unwrap_or_default();
        if content.is_empty() {
            return Err(Error::InvalidResponse("Empty analysis content".to_string()));
        }

        Ok(AnalysisResponse {
            content,
            model: chat_response.model,
        })
    }
}
