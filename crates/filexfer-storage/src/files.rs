//! Finished files under the storage root: listing, single-shot saves and
//! opening for download.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use futures::Stream;
use tokio::fs;

use filexfer_core::error::{AppError, ErrorKind};
use filexfer_core::result::AppResult;

use crate::layout::StorageRoot;
use crate::lock::LockTable;
use crate::transfer;

/// An opened finished file.
#[derive(Debug)]
pub struct StoredFile {
    /// Filename relative to the storage root.
    pub name: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Open handle positioned at the start.
    pub file: fs::File,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Access to the finished files in the storage root.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Arc<StorageRoot>,
    locks: Arc<LockTable>,
}

impl FileStore {
    /// Create a new file store.
    pub fn new(root: Arc<StorageRoot>, locks: Arc<LockTable>) -> Self {
        Self { root, locks }
    }

    /// Names of the regular files directly under the root, sorted.
    ///
    /// The scratch directory and any other subdirectory are left out.
    pub async fn list(&self) -> AppResult<Vec<String>> {
        let mut entries = fs::read_dir(self.root.path()).await.map_err(|e| {
            let kind = if e.kind() == std::io::ErrorKind::NotFound {
                ErrorKind::NotFound
            } else {
                ErrorKind::Storage
            };
            AppError::with_source(kind, "Could not list files", e)
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::debug!(name = ?raw, "Skipping non UTF-8 filename"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Store `stream` as `filename`, replacing any existing file atomically.
    pub async fn save<S, E>(&self, filename: &str, stream: S) -> AppResult<u64>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let dest = self.root.file_path(filename)?;
        let _file = self.locks.files.lock(filename).await;

        let staging = self.root.staging_path("upload");
        let bytes = transfer::write_atomically(&staging, &dest, stream).await?;

        tracing::info!(filename, bytes, "Stored file");
        Ok(bytes)
    }

    /// Open `filename` for reading.
    pub async fn open(&self, filename: &str) -> AppResult<StoredFile> {
        let path = self.root.file_path(filename)?;
        let not_found = || AppError::not_found("File not found");

        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                return Err(AppError::with_source(ErrorKind::NotFound, "File not found", e));
            }
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        Ok(StoredFile {
            name: filename.to_string(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            path,
            file,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::transfer::once;

    async fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let root = Arc::new(StorageRoot::open(dir.path()).await.unwrap());
        (dir, FileStore::new(root, Arc::default()))
    }

    #[tokio::test]
    async fn test_list_returns_sorted_regular_files() {
        let (dir, store) = store().await;
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("tmp/ignored"), b"x").unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_list_empty_root() {
        let (_dir, store) = store().await;
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_root_is_not_found() {
        let (dir, store) = store().await;
        std::fs::remove_dir_all(dir.path()).unwrap();

        let err = store.list().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_save_then_open() {
        let (_dir, store) = store().await;
        let n = store
            .save("report.txt", once(Bytes::from("contents")))
            .await
            .unwrap();
        assert_eq!(n, 8);

        let mut stored = store.open("report.txt").await.unwrap();
        assert_eq!(stored.size, 8);
        let mut buf = String::new();
        stored.file.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "contents");
    }

    #[tokio::test]
    async fn test_save_replaces_existing() {
        let (dir, store) = store().await;
        store.save("f", once(Bytes::from("one"))).await.unwrap();
        store.save("f", once(Bytes::from("two"))).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("f")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_open_missing_or_directory_is_not_found() {
        let (dir, store) = store().await;
        std::fs::create_dir(dir.path().join("folder")).unwrap();

        assert_eq!(store.open("nope").await.unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(store.open("folder").await.unwrap_err().kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (_dir, store) = store().await;
        assert_eq!(
            store.open("../etc/passwd").await.unwrap_err().kind,
            ErrorKind::Validation
        );
        assert_eq!(
            store.save("..", once(Bytes::new())).await.unwrap_err().kind,
            ErrorKind::Validation
        );
        assert_eq!(
            store.open("tmp").await.unwrap_err().kind,
            ErrorKind::Validation
        );
    }
}
