//! # filexfer-service
//!
//! Service layer for filexfer. The upload and download services sit on top
//! of [`filexfer_storage::StorageManager`]; the [`http`] module holds the
//! byte-range and conditional-request logic the download path is built on,
//! kept free of any handler so it can be reused on its own.
//!
//! Services follow constructor injection: the storage manager is handed in
//! at construction time as an `Arc`.

pub mod file;
pub mod http;

pub use file::{DownloadBody, DownloadResponse, DownloadService, FileService, UploadService};
