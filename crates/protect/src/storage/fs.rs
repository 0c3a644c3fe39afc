//! [`FilesystemStore`]: blob backend on a local directory tree.
//!
//! Layout: `<root>/<container>/<name>`. Containers are created on first write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;

use super::{BlobStore, ObjectKey, StorageError};

/// Local-directory blob backend.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &ObjectKey) -> Result<PathBuf, StorageError> {
        if !is_safe_component(key.container()) || !is_safe_component(key.name()) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key.container()).join(key.name()))
    }
}

/// A single path component that cannot climb out of, or reach across, the root.
fn is_safe_component(component: &str) -> bool {
    !component.is_empty()
        && component != "."
        && component != ".."
        && !component.contains(['/', '\\', '\0'])
}

fn io_error(key: &ObjectKey, source: std::io::Error) -> StorageError {
    match source.kind() {
        ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        ErrorKind::AlreadyExists => StorageError::AlreadyExists(key.to_string()),
        _ => StorageError::Io {
            key: key.to_string(),
            source,
        },
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn create(&self, key: &ObjectKey, data: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(key, e))?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| io_error(key, e))?;

        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Do not leave a truncated object behind.
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!(path = %key, error = %cleanup, "failed to remove partial object");
            }
            return Err(io_error(key, e));
        }
        Ok(())
    }

    async fn read(&self, key: &ObjectKey) -> Result<Bytes, StorageError> {
        let path = self.path_for(key)?;
        let data = fs::read(&path).await.map_err(|e| io_error(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> Result<(), StorageError> {
        let src = self.path_for(from)?;
        let dst = self.path_for(to)?;
        if !self.exists(from).await? {
            return Err(StorageError::NotFound(from.to_string()));
        }
        if self.exists(to).await? {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(to, e))?;
        }
        fs::rename(&src, &dst).await.map_err(|e| io_error(from, e))
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        fs::try_exists(&path).await.map_err(|e| io_error(key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FilesystemStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn create_then_read() {
        let (_dir, s) = store();
        let key = ObjectKey::new("docs", "a.bin");
        s.create(&key, Bytes::from_static(b"\x00\x01\xff")).await.unwrap();
        assert!(s.exists(&key).await.unwrap());
        assert_eq!(&s.read(&key).await.unwrap()[..], b"\x00\x01\xff");
    }

    #[tokio::test]
    async fn create_never_overwrites() {
        let (_dir, s) = store();
        let key = ObjectKey::new("docs", "a.bin");
        s.create(&key, Bytes::from_static(b"first")).await.unwrap();
        let err = s.create(&key, Bytes::from_static(b"second")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(&s.read(&key).await.unwrap()[..], b"first");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let (_dir, s) = store();
        let key = ObjectKey::new("docs", "missing.bin");
        assert!(!s.exists(&key).await.unwrap());
        assert!(matches!(
            s.read(&key).await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn rename_moves_object() {
        let (_dir, s) = store();
        let from = ObjectKey::new("docs", "a.bin");
        let to = ObjectKey::new("docs", "a.bin~deleted");
        s.create(&from, Bytes::from_static(b"x")).await.unwrap();
        s.rename(&from, &to).await.unwrap();
        assert!(!s.exists(&from).await.unwrap());
        assert_eq!(&s.read(&to).await.unwrap()[..], b"x");
        assert!(matches!(
            s.rename(&from, &to).await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn rejects_traversal_components() {
        let (_dir, s) = store();
        for key in [
            ObjectKey::new("..", "passwd"),
            ObjectKey::new("docs", "../escape"),
            ObjectKey::new("docs", ""),
            ObjectKey::new("docs\\x", "a"),
        ] {
            assert!(matches!(
                s.read(&key).await.unwrap_err(),
                StorageError::InvalidKey(_)
            ));
        }
    }
}
