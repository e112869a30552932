//! Storage root and chunked upload configuration.

use serde::{Deserialize, Serialize};

/// Storage root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding finished files and the `tmp/` scratch area.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Maximum request body size for single-shot uploads (default 5 GB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Maximum request body size for one chunk upload (default 64 MB).
    #[serde(default = "default_max_chunk")]
    pub max_chunk_size_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            max_upload_size_bytes: default_max_upload(),
            max_chunk_size_bytes: default_max_chunk(),
        }
    }
}

/// Chunked upload session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest `totalChunks` a merge will accept.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: u32,
    /// Delete the session's chunks even when a merge fails.
    #[serde(default)]
    pub cleanup_on_failure: bool,
    /// Age after which an untouched session directory is swept (0 disables).
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// Interval between sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_chunks: default_max_chunks(),
            cleanup_on_failure: false,
            session_ttl_seconds: default_session_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_root_path() -> String {
    "./uploads".to_string()
}

fn default_max_upload() -> u64 {
    5_368_709_120 // 5 GB
}

fn default_max_chunk() -> u64 {
    67_108_864 // 64 MB
}

fn default_max_chunks() -> u32 {
    10_000
}

fn default_session_ttl() -> u64 {
    86_400
}

fn default_sweep_interval() -> u64 {
    3_600
}
