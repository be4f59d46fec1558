use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Failures talking to a blob store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error for blob {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }
}

/// Path-addressed storage for binary content, independent of the metadata
/// store. Backed by the filesystem here; any object store with write, read,
/// and delete-by-key can stand in.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes a blob, creating parent directories as needed. Overwrites are
    /// not expected: keys come from [`generate_key`] and are unique.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Reads a blob back in full.
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Removes a blob. Fails if the key does not exist.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Generates a collision-resistant blob key: `{namespace}/{uuid}-{filename}`.
///
/// The random token exists solely to keep uploads sharing a filename from
/// colliding; the original filename is kept for human readability, sanitized
/// first so user input can never steer the path.
pub fn generate_key(namespace: &str, file_name: &str) -> String {
    format!(
        "{}/{}-{}",
        namespace,
        Uuid::new_v4(),
        sanitize_filename(file_name)
    )
}

/// Strips anything path-significant from a user-supplied filename.
///
/// Separators and other non-portable characters become underscores, and
/// leading dots are dropped, so the result is always a single plain path
/// component.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Filesystem-backed blob store rooted at a single directory.
///
/// Two instances back the application: a private root for purchasable assets
/// and a public root served directly to browsers.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key under the root, rejecting anything that could escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(key, e))?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        debug!(key, size = bytes.len(), "wrote blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.resolve(key)?;
        let bytes = fs::read(&path)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        Ok(Bytes::from(bytes))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        debug!(key, "deleted blob");
        Ok(())
    }
}
