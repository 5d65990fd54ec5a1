//! Application state shared across handlers.

use bazaar_core::config::AppConfig;
use bazaar_metadata::MetadataStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Configuration is validated here so handlers can rely on it.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails.
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>) -> Self {
        if let Err(error) = config.validate() {
            panic!("Invalid configuration: {}", error);
        }

        if config.repair.auto_repair_enabled && config.repair.interval_secs < 60 {
            tracing::warn!(
                interval_secs = config.repair.interval_secs,
                "Configuration warning: repair interval under one minute"
            );
        }

        Self {
            config: Arc::new(config),
            metadata,
        }
    }
}
