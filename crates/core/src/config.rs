//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, restrict this endpoint to the scraper at the
    /// network level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Serve the storefront catalog without a token (default: true).
    /// When false, catalog routes require `catalog:read`.
    #[serde(default = "default_public_catalog")]
    pub public_catalog: bool,
    /// Page size used when a list request does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Upper bound on requested page sizes.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_public_catalog() -> bool {
    true
}

fn default_page_size() -> u32 {
    crate::DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    crate::MAX_PAGE_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            public_catalog: default_public_catalog(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl ServerConfig {
    /// Clamp a requested page size into `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_page_size == 0 {
            return Err("server.max_page_size must be at least 1".to_string());
        }
        if self.default_page_size > self.max_page_size {
            return Err(format!(
                "server.default_page_size {} exceeds server.max_page_size {}",
                self.default_page_size, self.max_page_size
            ));
        }
        Ok(())
    }
}

/// Admin token configuration.
///
/// The admin token is required for server operation. It is the only way to
/// create sellers and further tokens on a fresh install. If the token hash
/// changes between restarts, the previous admin token is revoked and a new
/// one is created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Pre-computed hash of the admin token (SHA256 hex, 64 characters).
    /// Generate with: `echo -n "your-secret-token" | sha256sum`
    pub token_hash: String,
    /// Scopes for the admin token (default: ["platform:admin"]).
    pub token_scopes: Option<Vec<String>>,
    /// Description for the admin token.
    pub token_description: Option<String>,
}

impl AdminConfig {
    /// Create a test configuration with a dummy token hash.
    ///
    /// **For testing only.** The hash is deterministic but not a real token.
    pub fn for_testing() -> Self {
        Self {
            // SHA256 of "test-admin-token"
            token_hash: "17d6bfe05d1b1fb7bc499f8e3f639c7b3eda4c40f321eef8887a0c04c89a99c5"
                .to_string(),
            token_scopes: None,
            token_description: Some("Test admin token".to_string()),
        }
    }
}

/// Approval workflow configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Notify the owning seller after each decision (default: true).
    #[serde(default = "default_notify_sellers")]
    pub notify_sellers: bool,
    /// Refuse rejections that carry no reason (default: false).
    #[serde(default)]
    pub require_rejection_reason: bool,
}

fn default_notify_sellers() -> bool {
    true
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            notify_sellers: default_notify_sellers(),
            require_rejection_reason: false,
        }
    }
}

/// Visibility repair configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Run the repair sweeps on a timer (disabled by default).
    #[serde(default)]
    pub auto_repair_enabled: bool,
    /// Interval in seconds between scheduled runs (default: 1 hour).
    #[serde(default = "default_repair_interval_secs")]
    pub interval_secs: u64,
    /// Run the repair sweeps once before serving requests.
    #[serde(default)]
    pub repair_on_startup: bool,
}

fn default_repair_interval_secs() -> u64 {
    3600
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            auto_repair_enabled: false,
            interval_secs: default_repair_interval_secs(),
            repair_on_startup: false,
        }
    }
}

impl RepairConfig {
    /// Get the schedule interval as a std::time::Duration.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        // tokio::time::interval panics on a zero period
        if self.auto_repair_enabled && self.interval_secs == 0 {
            return Err(
                "repair.interval_secs cannot be 0 when repair.auto_repair_enabled is set"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (testing and single-node deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds (advisory only; SQLite cannot cancel queries).
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL (optional if using individual fields).
        /// Takes precedence over individual fields if both are provided.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer BAZAAR_METADATA__PASSWORD over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(60)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/bazaar.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => Err(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ),
                (None, Some(_), None) => Err(
                    "postgres config requires 'database' when using individual fields".to_string(),
                ),
            },
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Admin token configuration (required).
    pub admin: AdminConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub repair: RepairConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses SQLite metadata and a dummy admin token.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            metadata: MetadataConfig::default(),
            admin: AdminConfig::for_testing(),
            approval: ApprovalConfig::default(),
            repair: RepairConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.metadata.validate()?;
        self.repair.validate()?;
        Ok(())
    }
}
