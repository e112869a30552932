//! Streaming writes with staged, atomic placement.

use std::path::Path;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use filexfer_core::error::{AppError, ErrorKind};
use filexfer_core::result::AppResult;

/// Write every item of `stream` into a newly created file at `path`.
///
/// Returns the number of bytes written. A stream error (for example a client
/// disconnecting mid-body) is reported as a storage error.
pub async fn stream_to_file<S, E>(path: &Path, stream: S) -> AppResult<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut stream = std::pin::pin!(stream);
    let mut file = fs::File::create(path).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to create file: {}", path.display()),
            e,
        )
    })?;

    let mut total_bytes = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Upload stream read error", e))?;
        file.write_all(&chunk).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to write upload data", e)
        })?;
        total_bytes += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush file", e))?;
    file.sync_all()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to sync file", e))?;

    Ok(total_bytes)
}

/// Stream into `staging`, then rename it over `dest`.
///
/// Readers of `dest` see either the previous file or the complete new one.
/// The staging file is removed on every failure path.
pub async fn write_atomically<S, E>(staging: &Path, dest: &Path, stream: S) -> AppResult<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let written = match stream_to_file(staging, stream).await {
        Ok(n) => n,
        Err(e) => {
            discard(staging).await;
            return Err(e);
        }
    };
    commit(staging, dest).await?;
    Ok(written)
}

/// Rename a fully written staging file into place.
pub async fn commit(staging: &Path, dest: &Path) -> AppResult<()> {
    if let Err(e) = fs::rename(staging, dest).await {
        discard(staging).await;
        return Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to move file into place: {}", dest.display()),
            e,
        ));
    }
    debug!(dest = %dest.display(), "Committed file");
    Ok(())
}

/// Best-effort removal of a partial file.
pub async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial file");
        }
    }
}

/// A single-item stream over an in-memory payload.
pub fn once(data: Bytes) -> impl Stream<Item = Result<Bytes, std::convert::Infallible>> {
    futures::stream::once(async move { Ok(data) })
}
