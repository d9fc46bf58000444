//! Application state shared across handlers.

use crate::locks::SchemaLocks;
use crate::notifier::ChangeNotifier;
use std::sync::Arc;
use tabula_catalog::CatalogStore;
use tabula_core::config::AppConfig;
use tabula_storage::BlobStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Site, table and record catalog.
    pub catalog: Arc<dyn CatalogStore>,
    /// Blob store for record images.
    pub blobs: Arc<dyn BlobStore>,
    /// Change notification bus.
    pub notifier: Arc<ChangeNotifier>,
    /// Per-table schema locks.
    pub schema_locks: Arc<SchemaLocks>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        config: AppConfig,
        catalog: Arc<dyn CatalogStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            blobs,
            notifier: Arc::new(ChangeNotifier::new()),
            schema_locks: Arc::new(SchemaLocks::new()),
        }
    }
}
