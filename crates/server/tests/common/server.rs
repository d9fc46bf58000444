//! Server test utilities.

use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tabula_catalog::{CatalogStore, SqliteStore};
use tabula_core::config::{AppConfig, DatabaseConfig, StorageConfig};
use tabula_server::{AppState, create_router};
use tabula_storage::{BlobStore, FilesystemBackend};
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    /// Raw pool of the catalog database, for out-of-band schema changes.
    pub pool: Pool<Sqlite>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let blob_path = temp_dir.path().join("blobs");
        let blobs: Arc<dyn BlobStore> = Arc::new(
            FilesystemBackend::new(&blob_path)
                .await
                .expect("Failed to create blob store"),
        );

        let db_path = temp_dir.path().join("tabula.db");
        let store = SqliteStore::new(&db_path)
            .await
            .expect("Failed to create catalog store");
        let pool = store.pool().clone();
        let catalog: Arc<dyn CatalogStore> = Arc::new(store);

        let mut config = AppConfig {
            storage: StorageConfig::Filesystem { path: blob_path },
            database: DatabaseConfig::Sqlite { path: db_path },
            ..AppConfig::for_testing()
        };
        modifier(&mut config);

        let state = AppState::new(config, catalog, blobs);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            pool,
            _temp_dir: temp_dir,
        }
    }

    /// Run a statement directly against the catalog database.
    pub async fn execute_raw(&self, sql: &str) {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .unwrap_or_else(|e| panic!("raw statement failed: {sql}: {e}"));
    }
}
