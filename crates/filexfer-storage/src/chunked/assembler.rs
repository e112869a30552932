//! Merges the chunks of an upload session into a finished file.

use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use filexfer_core::config::UploadConfig;
use filexfer_core::error::{AppError, ErrorKind};
use filexfer_core::result::AppResult;

use crate::layout::{StorageRoot, validate_segment};
use crate::lock::LockTable;
use crate::transfer;

/// Outcome of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    /// Final filename under the storage root.
    pub filename: String,
    /// Size of the merged file in bytes.
    pub bytes: u64,
}

/// Assembles uploaded chunks into a finished file.
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    root: Arc<StorageRoot>,
    locks: Arc<LockTable>,
    max_chunks: u32,
    cleanup_on_failure: bool,
}

impl ChunkAssembler {
    /// Create a new chunk assembler.
    pub fn new(root: Arc<StorageRoot>, locks: Arc<LockTable>, config: &UploadConfig) -> Self {
        Self {
            root,
            locks,
            max_chunks: config.max_chunks,
            cleanup_on_failure: config.cleanup_on_failure,
        }
    }

    /// Merge chunks `1..=total_chunks` of `identifier` into `filename`.
    ///
    /// Chunks are appended in ascending sequence order into a staging file
    /// that replaces `filename` only once every chunk has been copied. The
    /// session directory is removed on success; on failure it is kept unless
    /// `cleanup_on_failure` is set.
    pub async fn assemble(
        &self,
        identifier: &str,
        filename: &str,
        total_chunks: &str,
    ) -> AppResult<MergedFile> {
        let session_dir = self.root.session_dir(identifier)?;
        let dest = self.root.file_path(filename)?;
        let total = self.parse_total(total_chunks)?;

        tracing::info!(identifier, filename, total_chunks = total, "Assembling chunks");

        let _session = self.locks.sessions.lock(identifier).await;
        let _file = self.locks.files.lock(filename).await;

        let staging = self.root.staging_path("merge");
        let result = match concat_chunks(&session_dir, total, &staging).await {
            Ok(bytes) => transfer::commit(&staging, &dest).await.map(|()| bytes),
            Err(e) => {
                transfer::discard(&staging).await;
                Err(e)
            }
        };

        if result.is_ok() || self.cleanup_on_failure {
            remove_session_dir(&session_dir).await;
        }

        let bytes = result?;
        tracing::info!(identifier, filename, bytes, "Assembly complete");

        Ok(MergedFile {
            filename: filename.to_string(),
            bytes,
        })
    }

    fn parse_total(&self, total_chunks: &str) -> AppResult<u32> {
        validate_segment("totalChunks", total_chunks)?;
        match total_chunks.trim().parse::<u32>() {
            Ok(0) => Err(AppError::validation("Invalid totalChunks: must be at least 1")),
            Ok(n) if n > self.max_chunks => Err(AppError::validation(format!(
                "Invalid totalChunks: at most {} chunks are allowed",
                self.max_chunks
            ))),
            Ok(n) => Ok(n),
            Err(_) => Err(AppError::validation("Invalid totalChunks")),
        }
    }
}

/// Append chunks `1..=total` of `session_dir` to a new file at `staging`.
async fn concat_chunks(session_dir: &Path, total: u32, staging: &Path) -> AppResult<u64> {
    let mut out = fs::File::create(staging).await.map_err(|e| {
        AppError::with_source(ErrorKind::Storage, "Could not create final file", e)
    })?;

    let mut total_bytes = 0u64;
    for sequence in 1..=total {
        let chunk_path = StorageRoot::chunk_path(session_dir, sequence);
        let mut chunk = match fs::File::open(&chunk_path).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(sequence, error = %e, "Chunk missing during merge");
                let mut err = AppError::chunk_missing(sequence);
                err.source = Some(Box::new(e));
                return Err(err);
            }
        };

        total_bytes += tokio::io::copy(&mut chunk, &mut out).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Could not merge chunk {sequence}"),
                e,
            )
            .with_details(serde_json::json!({ "chunk": sequence }))
        })?;
    }

    out.flush()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush merged file", e))?;
    out.sync_all()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to sync merged file", e))?;

    Ok(total_bytes)
}

async fn remove_session_dir(session_dir: &Path) {
    if let Err(e) = fs::remove_dir_all(session_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                dir = %session_dir.display(),
                error = %e,
                "Failed to remove upload session directory"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::chunked::ChunkedUploadHandler;
    use crate::transfer::once;

    struct Fixture {
        dir: tempfile::TempDir,
        writer: ChunkedUploadHandler,
        assembler: ChunkAssembler,
    }

    async fn fixture(config: UploadConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = Arc::new(StorageRoot::open(dir.path()).await.unwrap());
        let locks = Arc::new(LockTable::default());
        Fixture {
            writer: ChunkedUploadHandler::new(Arc::clone(&root), Arc::clone(&locks)),
            assembler: ChunkAssembler::new(root, locks, &config),
            dir,
        }
    }

    impl Fixture {
        async fn put(&self, id: &str, n: &str, data: &'static str) {
            self.writer
                .write_chunk(id, n, once(Bytes::from(data)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_merge_concatenates_in_sequence_order() {
        let fx = fixture(UploadConfig::default()).await;
        fx.put("id", "3", "three").await;
        fx.put("id", "1", "one-").await;
        fx.put("id", "2", "two-").await;

        let merged = fx.assembler.assemble("id", "out.bin", "3").await.unwrap();

        assert_eq!(merged.bytes, 12);
        assert_eq!(
            std::fs::read(fx.dir.path().join("out.bin")).unwrap(),
            b"one-two-three"
        );
        assert!(!fx.dir.path().join("tmp/id").exists());
    }

    #[tokio::test]
    async fn test_merge_ten_plus_chunks_uses_numeric_order() {
        let fx = fixture(UploadConfig::default()).await;
        let mut expected = String::new();
        for i in (1..=12).rev() {
            fx.writer
                .write_chunk("big", &i.to_string(), once(Bytes::from(format!("[{i}]"))))
                .await
                .unwrap();
        }
        for i in 1..=12 {
            expected.push_str(&format!("[{i}]"));
        }

        fx.assembler.assemble("big", "big.txt", "12").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(fx.dir.path().join("big.txt")).unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_missing_chunk_fails_without_partial_file() {
        let fx = fixture(UploadConfig::default()).await;
        fx.put("gap", "1", "a").await;
        fx.put("gap", "3", "c").await;

        let err = fx.assembler.assemble("gap", "gap.txt", "3").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::ChunkMissing);
        assert_eq!(err.details, Some(serde_json::json!({ "chunk": 2 })));
        assert!(!fx.dir.path().join("gap.txt").exists());
        // Chunks are kept so the client can fill the gap and retry.
        assert!(fx.dir.path().join("tmp/gap/1").exists());

        fx.put("gap", "2", "b").await;
        fx.assembler.assemble("gap", "gap.txt", "3").await.unwrap();
        assert_eq!(std::fs::read(fx.dir.path().join("gap.txt")).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_declared_total_above_present_is_chunk_missing() {
        let fx = fixture(UploadConfig::default()).await;
        fx.put("short", "1", "a").await;
        fx.put("short", "2", "b").await;

        let err = fx.assembler.assemble("short", "s.txt", "5").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::ChunkMissing);
        assert_eq!(err.details, Some(serde_json::json!({ "chunk": 3 })));
        assert!(!fx.dir.path().join("s.txt").exists());
    }

    #[tokio::test]
    async fn test_failed_merge_keeps_existing_destination() {
        let fx = fixture(UploadConfig::default()).await;
        std::fs::write(fx.dir.path().join("keep.txt"), b"old content").unwrap();

        let err = fx.assembler.assemble("none", "keep.txt", "1").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::ChunkMissing);
        assert_eq!(
            std::fs::read(fx.dir.path().join("keep.txt")).unwrap(),
            b"old content"
        );
    }

    #[tokio::test]
    async fn test_cleanup_on_failure_removes_chunks() {
        let fx = fixture(UploadConfig {
            cleanup_on_failure: true,
            ..UploadConfig::default()
        })
        .await;
        fx.put("doomed", "1", "a").await;

        let err = fx.assembler.assemble("doomed", "d.txt", "2").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::ChunkMissing);
        assert!(!fx.dir.path().join("tmp/doomed").exists());
    }

    #[tokio::test]
    async fn test_invalid_total_is_validation_error_without_side_effects() {
        let fx = fixture(UploadConfig {
            max_chunks: 4,
            ..UploadConfig::default()
        })
        .await;
        fx.put("v", "1", "a").await;

        for bad in ["abc", "0", "-2", "", "5"] {
            let err = fx.assembler.assemble("v", "v.txt", bad).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "accepted {bad:?}");
        }
        assert!(fx.dir.path().join("tmp/v/1").exists());
        assert!(!fx.dir.path().join("v.txt").exists());
    }

    #[tokio::test]
    async fn test_no_staging_files_left_behind() {
        let fx = fixture(UploadConfig::default()).await;
        fx.put("s", "1", "x").await;
        fx.assembler.assemble("s", "s.txt", "1").await.unwrap();
        let _ = fx.assembler.assemble("s", "s.txt", "1").await.unwrap_err();

        let leftovers: Vec<_> = std::fs::read_dir(fx.dir.path().join("tmp"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }
}
