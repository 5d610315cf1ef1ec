pub mod domain;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod strategy;
pub mod time;

pub use error::{CoreError, ErrorKind};

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub data_provider_base_url: Option<String>,
        pub data_provider_api_key: Option<String>,
        pub strategy_config_path: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                data_provider_base_url: std::env::var("DATA_PROVIDER_BASE_URL").ok(),
                data_provider_api_key: std::env::var("DATA_PROVIDER_API_KEY").ok(),
                strategy_config_path: std::env::var("STRATEGY_CONFIG_PATH")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
            })
        }

        pub fn require_data_provider_base_url(&self) -> anyhow::Result<&str> {
            self.data_provider_base_url
                .as_deref()
                .context("DATA_PROVIDER_BASE_URL is required")
        }

        /// Strategy table from `STRATEGY_CONFIG_PATH`, or the built-in defaults.
        pub fn load_strategy(&self) -> anyhow::Result<crate::strategy::StrategyConfig> {
            match self.strategy_config_path.as_deref() {
                Some(path) => crate::strategy::StrategyConfig::load(path),
                None => Ok(crate::strategy::StrategyConfig::default()),
            }
        }
    }
}
