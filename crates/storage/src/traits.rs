//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Opaque blob storage for record images.
///
/// Callers only ever hold the key returned by [`BlobStore::store`]; the
/// catalog persists it in the reserved `image_id` column.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a fresh key derived from `suggested_name`.
    async fn store(&self, data: Bytes, suggested_name: &str) -> StorageResult<String>;

    /// Read a blob by key.
    async fn retrieve(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete a blob. Returns `false` if it did not exist.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
