//! Response DTOs.

use serde::{Deserialize, Serialize};

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

impl MessageResponse {
    /// Creates a message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a successful merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResponse {
    /// Message.
    pub message: String,
    /// Name of the merged file.
    pub filename: String,
    /// Size of the merged file in bytes.
    pub size: u64,
}

/// File listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    /// Stored filenames.
    pub files: Vec<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Server version.
    pub version: String,
}
