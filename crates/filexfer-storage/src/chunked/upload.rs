//! Chunk writer for multi-part uploads.

use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tokio::fs;
use tracing::debug;

use filexfer_core::error::{AppError, ErrorKind};
use filexfer_core::result::AppResult;

use crate::layout::{PART_SUFFIX, StorageRoot, parse_sequence};
use crate::lock::LockTable;
use crate::transfer;

/// A chunk that has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenChunk {
    /// Sequence number the chunk was stored under.
    pub sequence: u32,
    /// Payload size in bytes.
    pub bytes: u64,
}

/// Handles individual chunk writes during a chunked upload.
#[derive(Debug, Clone)]
pub struct ChunkedUploadHandler {
    root: Arc<StorageRoot>,
    locks: Arc<LockTable>,
}

impl ChunkedUploadHandler {
    /// Create a new chunked upload handler.
    pub fn new(root: Arc<StorageRoot>, locks: Arc<LockTable>) -> Self {
        Self { root, locks }
    }

    /// Write one chunk into the session's scratch directory.
    ///
    /// The payload lands in `<n>.part` and is renamed to `<n>` once complete,
    /// replacing any earlier upload of the same chunk.
    pub async fn write_chunk<S, E>(
        &self,
        identifier: &str,
        chunk_number: &str,
        payload: S,
    ) -> AppResult<WrittenChunk>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let session_dir = self.root.session_dir(identifier)?;
        let sequence = parse_sequence("chunkNumber", chunk_number)?;

        let _session = self.locks.sessions.lock(identifier).await;

        fs::create_dir_all(&session_dir).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Could not create temp directory", e)
        })?;

        let chunk_path = StorageRoot::chunk_path(&session_dir, sequence);
        let part_path = session_dir.join(format!("{sequence}{PART_SUFFIX}"));
        let bytes = transfer::write_atomically(&part_path, &chunk_path, payload).await?;

        debug!(identifier, sequence, bytes, "Stored chunk");
        Ok(WrittenChunk { sequence, bytes })
    }
}
