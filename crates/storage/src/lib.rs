//! Blob storage for tabula record images.
//!
//! Provides the [`BlobStore`] abstraction, the local filesystem backend and
//! the image upload policy (accepted media types, key naming).

pub mod backends;
pub mod error;
pub mod image;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::BlobStore;

use std::sync::Arc;
use tabula_core::config::StorageConfig;

/// Create a blob store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn BlobStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}
