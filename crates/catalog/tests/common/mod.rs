//! Shared test utilities for catalog integration tests.

pub mod scenarios;

use std::sync::Arc;
use tabula_catalog::{CatalogError, CatalogResult, CatalogStore, PostgresStore, SqliteStore};
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Stable prefix for Docker/container startup failures in Postgres test setup.
/// Tests use this marker to decide whether to skip due to unavailable Docker.
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

enum Backend {
    Sqlite(Arc<SqliteStore>),
    Postgres(Arc<PostgresStore>),
}

/// Keeps the backing database alive for the duration of a test.
#[allow(dead_code)]
enum Guard {
    TempDir(TempDir),
    Container(ContainerAsync<Postgres>),
}

/// A test catalog wrapper that cleans up on drop.
pub struct TestCatalog {
    pub store: Arc<dyn CatalogStore>,
    backend: Backend,
    _guard: Guard,
}

impl TestCatalog {
    /// Create a catalog backed by a SQLite file in a temporary directory.
    pub async fn sqlite() -> CatalogResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("test.db")).await?);

        Ok(Self {
            store: store.clone(),
            backend: Backend::Sqlite(store),
            _guard: Guard::TempDir(temp_dir),
        })
    }

    /// Create a catalog backed by a PostgreSQL testcontainer.
    pub async fn postgres() -> CatalogResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                CatalogError::Internal(format!(
                    "{} Failed to start PostgreSQL container: {e}",
                    POSTGRES_CONTAINER_START_ERR_PREFIX
                ))
            })?;

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        // Default credentials from testcontainers-modules postgres
        let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
        let store = Arc::new(PostgresStore::from_url(&url, 5, None).await?);

        Ok(Self {
            store: store.clone(),
            backend: Backend::Postgres(store),
            _guard: Guard::Container(container),
        })
    }

    /// Get a handle to the catalog store.
    pub fn store(&self) -> Arc<dyn CatalogStore> {
        self.store.clone()
    }

    /// Run raw SQL directly against the backend, bypassing the catalog.
    pub async fn execute_raw(&self, sql: &str) {
        match &self.backend {
            Backend::Sqlite(store) => {
                sqlx::query(sql)
                    .execute(store.pool())
                    .await
                    .expect("raw SQL failed");
            }
            Backend::Postgres(store) => {
                sqlx::query(sql)
                    .execute(store.pool())
                    .await
                    .expect("raw SQL failed");
            }
        }
    }
}

/// Try to create a PostgreSQL test catalog, skipping if Docker is unavailable
/// or SKIP_POSTGRES_TESTS is set.
///
/// Only container-start failures cause a skip; migration or connection
/// errors still panic.
pub async fn postgres_or_skip() -> Option<TestCatalog> {
    if std::env::var("SKIP_POSTGRES_TESTS").is_ok() {
        return None;
    }
    match TestCatalog::postgres().await {
        Ok(catalog) => Some(catalog),
        Err(err) => {
            let msg = err.to_string();
            if msg.contains(POSTGRES_CONTAINER_START_ERR_PREFIX) {
                eprintln!("Skipping PostgreSQL test (Docker unavailable): {msg}");
                None
            } else {
                panic!("PostgreSQL test setup failed: {msg}");
            }
        }
    }
}
