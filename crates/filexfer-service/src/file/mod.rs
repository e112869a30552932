//! File services: listing, uploads and downloads.

pub mod download;
pub mod service;
pub mod upload;

pub use download::{DownloadBody, DownloadResponse, DownloadService};
pub use service::FileService;
pub use upload::UploadService;
