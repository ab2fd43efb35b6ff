//! Application configuration

use prism_core::{retry::RetryConfig, OrchestratorConfig};
use serde::Deserialize;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Analyzer provider settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Memory store settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Orchestration engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:2024".to_string()
}

/// Analyzer provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Chat-completions endpoint; the mock analyzer is used when absent
    pub endpoint: Option<String>,
    /// API key (also read from PRISM_ANALYZER_API_KEY)
    pub api_key: Option<String>,
    /// Model requested from the endpoint
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-call deadline in milliseconds
    #[serde(default = "default_analyzer_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: default_model(),
            timeout_ms: default_analyzer_timeout_ms(),
        }
    }
}

fn default_model() -> String {
    "default".to_string()
}

fn default_analyzer_timeout_ms() -> u64 {
    45_000
}

/// Memory store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store URI (`sqlite:<path>` or `memory:`); overrides `data_dir`
    pub uri: Option<String>,
    /// Directory for the default SQLite database
    pub data_dir: Option<String>,
    /// Size of the duplicate-detection window
    #[serde(default = "default_duplicate_window")]
    pub duplicate_window: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: None,
            data_dir: None,
            duplicate_window: default_duplicate_window(),
        }
    }
}

fn default_duplicate_window() -> usize {
    5
}

/// Orchestration engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// How many prior entries feed prompt context
    #[serde(default = "default_history_context_limit")]
    pub history_context_limit: usize,
    /// Whole-request deadline in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum analyzer attempts per call
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Base retry delay in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_context_limit: default_history_context_limit(),
            request_timeout_ms: default_request_timeout_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn default_history_context_limit() -> usize {
    10
}

fn default_request_timeout_ms() -> u64 {
    180_000
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

impl AppConfig {
    /// Build the engine configuration from the application settings.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new()
            .with_history_context_limit(self.engine.history_context_limit)
            .with_analyzer_timeout(Duration::from_millis(self.analyzer.timeout_ms))
            .with_request_timeout(Duration::from_millis(self.engine.request_timeout_ms))
            .with_retry(
                RetryConfig::new()
                    .with_max_attempts(self.engine.retry_max_attempts)
                    .with_base_delay(Duration::from_millis(self.engine.retry_base_delay_ms)),
            )
    }
}
