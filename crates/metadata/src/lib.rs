//! Metadata store abstraction and implementations for Bazaar.
//!
//! This crate provides the marketplace data model:
//! - Product listings and their approval columns
//! - Approval patches and visibility repair sweeps
//! - Seller accounts and seller notifications
//! - Tokens, scopes, and revocation

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use store::{MetadataStore, SqliteStore};

use bazaar_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = if let Some(url) = url {
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(MetadataError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
