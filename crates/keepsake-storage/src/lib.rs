use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    /// A blob with this key is already stored; keys are never overwritten.
    #[error("key already exists: {0}")]
    KeyExists(String),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// On-disk blob store for uploaded media.
///
/// Each blob lives as a flat file at `{dir}/{key}` and is publicly reachable
/// at `{public_base}/media/{key}` once the directory is mounted on the
/// server's `/media` route.
pub struct Storage {
    dir: PathBuf,
    public_base: String,
}

impl Storage {
    pub async fn new(dir: PathBuf, public_base: impl Into<String>) -> Result<Self, StorageError> {
        fs::create_dir_all(&dir).await?;
        info!("Media storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_base: public_base.into(),
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Path to the blob for a given key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Publicly resolvable URL for a stored key. With an empty base this is a
    /// same-origin relative URL.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/media/{}", self.public_base, key)
    }

    /// Store bytes under `key`. Fails if the key already exists — generated
    /// keys are unique, so an existing file means a collision, not a retry.
    pub async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);
        let mut file = match fs::File::options().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::KeyExists(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> bool {
        fs::metadata(self.path_for(key)).await.is_ok()
    }

    /// Delete a blob. A missing file is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => {
                info!("Deleted blob {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob {} already gone", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List all stored keys.
    pub async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                keys.push(name.to_string());
            }
        }
        Ok(keys)
    }
}

// Keys are generated server-side but still must never escape the directory.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty()
        || key.contains('/')
        || key.contains('\\')
        || key.contains("..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_test_storage() -> (Storage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("media"), "").await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn store_then_read_back() {
        let (storage, _dir) = open_test_storage().await;
        storage.store("a.jpg", b"hello").await.unwrap();
        assert!(storage.exists("a.jpg").await);
        let bytes = tokio::fs::read(storage.path_for("a.jpg")).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn store_refuses_existing_key() {
        let (storage, _dir) = open_test_storage().await;
        storage.store("a.jpg", b"one").await.unwrap();
        let err = storage.store("a.jpg", b"two").await.unwrap_err();
        assert!(matches!(err, StorageError::KeyExists(_)));
        // Original bytes untouched
        let bytes = tokio::fs::read(storage.path_for("a.jpg")).await.unwrap();
        assert_eq!(bytes, b"one");
    }

    #[tokio::test]
    async fn delete_is_tolerant_of_missing_keys() {
        let (storage, _dir) = open_test_storage().await;
        storage.delete("never-stored.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let (storage, _dir) = open_test_storage().await;
        assert!(storage.store("../evil", b"x").await.is_err());
        assert!(storage.store("a/b", b"x").await.is_err());
    }

    #[tokio::test]
    async fn public_url_joins_base_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("m"), "https://example.com")
            .await
            .unwrap();
        assert_eq!(
            storage.public_url("a.jpg"),
            "https://example.com/media/a.jpg"
        );
    }
}
