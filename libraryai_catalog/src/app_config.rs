use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::admin::PageSize;
use crate::catalog_data_source::{CatalogDataSource, InMemoryCatalogDataSource};
use crate::detail::DEFAULT_CHECKOUT_DAYS;
use crate::search::SummaryFailurePolicy;

pub const ENV_PREFIX: &str = "LIBRARYAI";
pub const DEFAULT_CONFIG_FILE: &str = "libraryai.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    #[default]
    Remote,
    /// Bundled fixture catalog, no network needed
    InMemory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data_source: DataSourceKind,
    #[serde(default = "AppConfig::default_api_url")]
    pub api_url: String,
    #[serde(default = "AppConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub default_page_size: PageSize,
    #[serde(default = "AppConfig::default_checkout_days")]
    pub checkout_days: u32,
    #[serde(default)]
    pub simulated_latency_ms: u64,
    #[serde(default)]
    pub summary_policy: SummaryFailurePolicy,
}

impl AppConfig {
    fn default_api_url() -> String {
        "http://127.0.0.1:3055".to_string()
    }

    fn default_request_timeout_ms() -> u64 {
        10_000
    }

    fn default_checkout_days() -> u32 {
        DEFAULT_CHECKOUT_DAYS
    }

    /// Layers the optional config file and `LIBRARYAI_*` environment variables over the defaults.
    /// Without an explicit path `libraryai.toml` is used when present.
    pub fn load(config_file: Option<&Path>) -> anyhow::Result<Self> {
        let file_source = match config_file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        anyhow::ensure!(
            app_config.checkout_days > 0,
            "checkout_days must be positive"
        );
        Ok(app_config)
    }

    /// Checkout duration asked for on the command line, or the configured default
    pub fn checkout_days_or(&self, requested: Option<u32>) -> anyhow::Result<u32> {
        let days = requested.unwrap_or(self.checkout_days);
        anyhow::ensure!(days > 0, "checkout days must be positive");
        Ok(days)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_source: DataSourceKind::default(),
            api_url: Self::default_api_url(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            default_page_size: PageSize::default(),
            checkout_days: Self::default_checkout_days(),
            simulated_latency_ms: 0,
            summary_policy: SummaryFailurePolicy::default(),
        }
    }
}

/// Creates the catalog selected by the configuration
pub fn build_data_source(app_config: &AppConfig) -> anyhow::Result<Arc<dyn CatalogDataSource>> {
    let data_source: Arc<dyn CatalogDataSource> = match app_config.data_source {
        DataSourceKind::InMemory => {
            tracing::info!("Using in-memory catalog");
            Arc::new(
                InMemoryCatalogDataSource::with_fixture_books()
                    .with_latency(Duration::from_millis(app_config.simulated_latency_ms)),
            )
        }
        #[cfg(feature = "client")]
        DataSourceKind::Remote => {
            tracing::info!("Using remote catalog at {}", app_config.api_url);
            Arc::new(crate::catalog_data_source::RemoteCatalogDataSource::new(
                &app_config.api_url,
                app_config.request_timeout(),
            )?)
        }
        #[cfg(not(feature = "client"))]
        DataSourceKind::Remote => {
            anyhow::bail!("Remote catalog requires the `client` feature")
        }
    };
    Ok(data_source)
}
