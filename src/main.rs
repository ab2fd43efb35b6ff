//! Prism - Multi-Perspective Requirement Refinement Service
//!
//! CLI entry point for the Prism server.
//!
//! Note: Prism uses embedded SQLite for storage (no external database
//! required). Data is stored under the configured data directory.

#![forbid(unsafe_code)]

mod api;
mod server;

use anyhow::{bail, Context, Result};
use prism_core::Orchestrator;
use prism_llm::{Analyzer, HttpAnalyzer, HttpAnalyzerConfig, MockAnalyzer};
use prism_memory::{MemoryStore, SqliteStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server::AppConfig;

/// Validate configuration for production deployments
fn validate_production_config(config: &AppConfig) {
    let is_production = std::env::var("PRISM_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);

    if !is_production {
        return;
    }

    if config.server.listen_address.starts_with("0.0.0.0") {
        warn!(
            "Server is binding to all interfaces (0.0.0.0) in production. \
             Consider binding to 127.0.0.1 and using a reverse proxy."
        );
    }

    if config.analyzer.endpoint.is_none() {
        warn!("No analyzer endpoint configured in production; the mock analyzer will be used.");
    }

    if config.store.uri.is_none() && config.store.data_dir.is_none() {
        warn!("No store location configured in production; defaulting to ./data.");
    }
}

/// Resolve the analyzer from configuration. Falls back to the mock analyzer
/// when no endpoint is configured.
fn resolve_analyzer(config: &AppConfig) -> Result<Arc<dyn Analyzer>> {
    let api_key = config
        .analyzer
        .api_key
        .clone()
        .or_else(|| std::env::var("PRISM_ANALYZER_API_KEY").ok());

    match (&config.analyzer.endpoint, api_key) {
        (Some(endpoint), Some(api_key)) => {
            let analyzer_config = HttpAnalyzerConfig::new(endpoint, api_key)
                .with_model(config.analyzer.model.clone())
                .with_timeout(Duration::from_millis(config.analyzer.timeout_ms));
            let analyzer =
                HttpAnalyzer::new(analyzer_config).context("Failed to create HTTP analyzer")?;
            info!(endpoint = %endpoint, "HTTP analyzer initialized");
            Ok(Arc::new(analyzer))
        }
        (Some(_), None) => {
            bail!(
                "analyzer endpoint is configured but no API key was found; \
                 set analyzer.api_key or PRISM_ANALYZER_API_KEY"
            )
        }
        (None, _) => {
            warn!("No analyzer endpoint configured, using the mock analyzer");
            Ok(Arc::new(MockAnalyzer::new()))
        }
    }
}

/// Resolve the memory store from configuration.
async fn resolve_store(config: &AppConfig) -> Result<Arc<dyn MemoryStore>> {
    let store = match &config.store.uri {
        Some(uri) => SqliteStore::from_uri(uri)
            .await
            .with_context(|| format!("Failed to open memory store at {uri}"))?,
        None => {
            let data_dir = config
                .store
                .data_dir
                .clone()
                .unwrap_or_else(|| "data".to_string());
            let db_path = std::path::Path::new(&data_dir).join("prism.db");
            SqliteStore::from_path(&db_path)
                .await
                .context("Failed to initialize SQLite memory store")?
        }
    };
    Ok(Arc::new(
        store.with_duplicate_window(config.store.duplicate_window),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prism=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Prism v{}", env!("CARGO_PKG_VERSION"));

    let config = server::load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");
    validate_production_config(&config);

    let store = resolve_store(&config).await?;
    let analyzer = resolve_analyzer(&config)?;

    let orchestrator = Arc::new(
        Orchestrator::new(analyzer, store).with_config(config.orchestrator_config()),
    );
    info!(
        analyzer = orchestrator.analyzer_name(),
        "Orchestrator initialized"
    );

    let state = api::RefineState::new(Arc::clone(&orchestrator));
    let app = api::api_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config
        .server
        .listen_address
        .parse()
        .context("Invalid listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    let cancelled = orchestrator.cancel_all();
    if cancelled > 0 {
        info!(count = cancelled, "Cancelled in-flight runs on shutdown");
    }
    info!("Prism shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
