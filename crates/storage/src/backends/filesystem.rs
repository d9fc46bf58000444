//! Local filesystem blob backend.

use crate::error::{StorageError, StorageResult};
use crate::image::image_key;
use crate::traits::BlobStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Key collisions tolerated before an upload gives up.
const MAX_KEY_ATTEMPTS: u32 = 8;

/// Blobs stored as flat files under a root directory.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Resolve a key to a path inside the root.
    ///
    /// Runs on the blocking pool because it canonicalizes paths.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Keys are single file names. Anything that could name a directory,
    /// a hidden file, or a path outside the root is rejected, and an
    /// existing entry must not resolve (through a symlink) outside the root.
    fn key_path_sync(root: &Path, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains(['/', '\\', '\0'])
            || key.contains("..")
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let path = root.join(key);
        match std::fs::symlink_metadata(&path) {
            Ok(_) => {
                let root_canonical = root.canonicalize()?;
                let resolved = path
                    .canonicalize()
                    .map_err(|_| StorageError::InvalidKey(format!("dangling link: {key}")))?;
                if !resolved.starts_with(&root_canonical) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolves outside the storage root: {key}"
                    )));
                }
                Ok(path)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn not_found(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
        move |e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        }
    }

    /// Candidate key for an upload; retries get a random prefix.
    fn candidate_key(suggested_name: &str, attempt: u32) -> String {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let key = image_key(suggested_name, millis);
        if attempt == 0 {
            return key;
        }
        let unique = Uuid::new_v4().simple().to_string();
        format!("{}-{}", &unique[..8], key)
    }
}

#[async_trait]
impl BlobStore for FilesystemBackend {
    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn store(&self, data: Bytes, suggested_name: &str) -> StorageResult<String> {
        // Write beside the target, then link it into place so readers never
        // see a partial file. Linking fails on an existing key, unlike rename.
        let temp_path = self.root.join(format!(".tmp.{}", Uuid::new_v4()));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }

        let mut attempt = 0;
        let linked = loop {
            let key = Self::candidate_key(suggested_name, attempt);
            let path = match self.key_path(&key).await {
                Ok(path) => path,
                Err(e) => break Err(e),
            };
            match fs::hard_link(&temp_path, &path).await {
                Ok(()) => break Ok(key),
                Err(e)
                    if e.kind() == std::io::ErrorKind::AlreadyExists
                        && attempt < MAX_KEY_ATTEMPTS =>
                {
                    attempt += 1;
                }
                Err(e) => break Err(StorageError::Io(e)),
            }
        };
        let _ = fs::remove_file(&temp_path).await;
        let key = linked?;

        tracing::debug!(key = %key, "Stored blob");
        Ok(key)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn retrieve(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key).await?;
        let data = fs::read(&path).await.map_err(Self::not_found(key))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }
}
