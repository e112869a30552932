//! File listing service.

use std::sync::Arc;

use filexfer_core::result::AppResult;
use filexfer_storage::StorageManager;

/// Read-only queries over the stored files.
#[derive(Debug, Clone)]
pub struct FileService {
    /// Storage manager.
    storage: Arc<StorageManager>,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(storage: Arc<StorageManager>) -> Self {
        Self { storage }
    }

    /// Names of all finished files.
    pub async fn list_files(&self) -> AppResult<Vec<String>> {
        let files = self.storage.files().list().await?;
        tracing::debug!(count = files.len(), "Listed files");
        Ok(files)
    }
}
