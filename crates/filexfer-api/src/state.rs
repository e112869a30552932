//! Application state shared across all handlers.

use std::sync::Arc;

use filexfer_core::config::AppConfig;
use filexfer_service::{DownloadService, FileService, UploadService};
use filexfer_storage::StorageManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// File listing service
    pub file_service: Arc<FileService>,
    /// Upload service
    pub upload_service: Arc<UploadService>,
    /// Download service
    pub download_service: Arc<DownloadService>,
}

impl AppState {
    /// Wire the services around one storage manager.
    pub fn new(config: AppConfig, storage: Arc<StorageManager>) -> Self {
        Self {
            config: Arc::new(config),
            file_service: Arc::new(FileService::new(Arc::clone(&storage))),
            upload_service: Arc::new(UploadService::new(Arc::clone(&storage))),
            download_service: Arc::new(DownloadService::new(storage)),
        }
    }
}
