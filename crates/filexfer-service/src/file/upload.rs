//! File upload service: single-shot and chunked upload flows.

use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tracing::info;

use filexfer_core::result::AppResult;
use filexfer_storage::{MergedFile, StorageManager, WrittenChunk};

/// Handles both single-shot and chunked uploads.
#[derive(Debug, Clone)]
pub struct UploadService {
    /// Storage manager.
    storage: Arc<StorageManager>,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(storage: Arc<StorageManager>) -> Self {
        Self { storage }
    }

    /// Store one chunk of the upload session `identifier`.
    pub async fn upload_chunk<S, E>(
        &self,
        identifier: &str,
        chunk_number: &str,
        payload: S,
    ) -> AppResult<WrittenChunk>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let written = self
            .storage
            .chunks()
            .write_chunk(identifier, chunk_number, payload)
            .await?;
        info!(
            identifier,
            chunk = written.sequence,
            bytes = written.bytes,
            "Chunk uploaded"
        );
        Ok(written)
    }

    /// Merge the chunks of `identifier` into `filename`.
    pub async fn merge(
        &self,
        identifier: &str,
        filename: &str,
        total_chunks: &str,
    ) -> AppResult<MergedFile> {
        let merged = self
            .storage
            .assembler()
            .assemble(identifier, filename, total_chunks)
            .await?;
        info!(
            identifier,
            filename = %merged.filename,
            bytes = merged.bytes,
            "File merged"
        );
        Ok(merged)
    }

    /// Store a whole file in one request.
    pub async fn upload_simple<S, E>(&self, filename: &str, payload: S) -> AppResult<u64>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.storage.files().save(filename, payload).await
    }
}
