//! Metadata store test utilities.

use bazaar_metadata::{MetadataError, MetadataResult, MetadataStore, PostgresStore, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Stable prefix for container startup failures in Postgres test setup.
/// Tests match on it to skip when Docker is unavailable.
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

/// SQLite-backed store; a file-backed database lives as long as the wrapper.
#[allow(dead_code)]
pub struct TestMetadata {
    pub store: Arc<dyn MetadataStore>,
    _temp_dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestMetadata {
    /// File-backed SQLite store in a temp directory.
    pub async fn new() -> MetadataResult<Self> {
        let temp_dir = tempfile::tempdir()?;
        let store = SqliteStore::new(&temp_dir.path().join("test.db"), None).await?;
        Ok(Self {
            store: Arc::new(store),
            _temp_dir: Some(temp_dir),
        })
    }

    /// In-memory SQLite store.
    pub async fn in_memory() -> MetadataResult<Self> {
        let store = SqliteStore::new(":memory:", None).await?;
        Ok(Self {
            store: Arc::new(store),
            _temp_dir: None,
        })
    }

    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }
}

/// PostgreSQL store running in a testcontainer.
#[allow(dead_code)]
pub struct PostgresTestMetadata {
    pub store: Arc<dyn MetadataStore>,
    _container: ContainerAsync<Postgres>,
}

#[allow(dead_code)]
impl PostgresTestMetadata {
    pub async fn new() -> MetadataResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                MetadataError::Internal(format!(
                    "{POSTGRES_CONTAINER_START_ERR_PREFIX} failed to start PostgreSQL container: {e}"
                ))
            })?;

        let host = container
            .get_host()
            .await
            .map_err(|e| MetadataError::Internal(format!("container host: {e}")))?;
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .map_err(|e| MetadataError::Internal(format!("container port: {e}")))?;

        // testcontainers-modules default credentials
        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
        let store = PostgresStore::from_url(&url, 5, None).await?;

        Ok(Self {
            store: Arc::new(store),
            _container: container,
        })
    }

    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }
}

/// Run a test body against SQLite, then PostgreSQL when Docker is available.
#[allow(dead_code)]
pub async fn run_metadata_test_both<F, Fut>(test_fn: F)
where
    F: Fn(Arc<dyn MetadataStore>) -> Fut + Clone,
    Fut: std::future::Future<Output = ()>,
{
    let sqlite = TestMetadata::new()
        .await
        .expect("Failed to create SQLite test metadata");
    test_fn.clone()(sqlite.store()).await;

    if std::env::var("SKIP_POSTGRES_TESTS").is_ok() {
        return;
    }
    match PostgresTestMetadata::new().await {
        Ok(postgres) => test_fn(postgres.store()).await,
        Err(err) if err.to_string().contains(POSTGRES_CONTAINER_START_ERR_PREFIX) => {
            eprintln!("Skipping PostgreSQL metadata tests: {err}");
        }
        Err(err) => panic!("PostgreSQL test setup failed: {err}"),
    }
}
