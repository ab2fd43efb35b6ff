//! Configuration loading from files and environment

use anyhow::{Context, Result};
use config::{Config, Environment, File};

use super::config::AppConfig;

/// Load configuration, layered: `config/default` < `config/local` <
/// `config/{PRISM_ENV}` < `PRISM__`-prefixed environment variables.
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(
            File::with_name(&format!(
                "config/{}",
                std::env::var("PRISM_ENV").unwrap_or_else(|_| "development".to_string())
            ))
            .required(false),
        )
        .add_source(
            Environment::with_prefix("PRISM")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
