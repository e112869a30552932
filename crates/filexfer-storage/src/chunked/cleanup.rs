//! Abandoned upload session cleanup.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::sync::watch;

use filexfer_core::result::AppResult;

use crate::layout::{PART_SUFFIX, StorageRoot};
use crate::lock::LockTable;

/// Removes session directories and staging files nobody has touched in a while.
#[derive(Debug, Clone)]
pub struct SessionSweeper {
    root: Arc<StorageRoot>,
    locks: Arc<LockTable>,
}

impl SessionSweeper {
    /// Create a new session sweeper.
    pub fn new(root: Arc<StorageRoot>, locks: Arc<LockTable>) -> Self {
        Self { root, locks }
    }

    /// Delete everything under the scratch directory older than `ttl`.
    ///
    /// Session directories are removed under their session lock, so a sweep
    /// never races a chunk write or merge of the same identifier. Returns the
    /// number of entries removed.
    pub async fn sweep(&self, ttl: Duration) -> AppResult<usize> {
        let scratch = self.root.scratch_dir();
        let mut entries = match fs::read_dir(&scratch).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };

            if file_type.is_dir() {
                let Some(identifier) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if !is_stale(&path, ttl).await {
                    continue;
                }
                let _session = self.locks.sessions.lock(&identifier).await;
                // A writer may have touched it while we waited.
                if !is_stale(&path, ttl).await {
                    continue;
                }
                match fs::remove_dir_all(&path).await {
                    Ok(()) => {
                        tracing::debug!(identifier = %identifier, "Swept upload session");
                        removed += 1;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(identifier = %identifier, error = %e, "Failed to sweep upload session");
                    }
                }
            } else if path.to_string_lossy().ends_with(PART_SUFFIX) && is_stale(&path, ttl).await {
                match fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to sweep staging file");
                    }
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Swept abandoned upload data");
        }
        Ok(removed)
    }

    /// Sweep every `interval` until `shutdown` flips to `true`.
    ///
    /// A zero `ttl` or `interval` disables sweeping.
    pub async fn run(self, interval: Duration, ttl: Duration, mut shutdown: watch::Receiver<bool>) {
        if interval.is_zero() || ttl.is_zero() {
            tracing::info!("Session sweeper disabled");
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep(ttl).await {
                        tracing::warn!(error = %e, "Session sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Session sweeper stopped");
    }
}

async fn is_stale(path: &Path, ttl: Duration) -> bool {
    let Ok(modified) = fs::metadata(path).await.and_then(|m| m.modified()) else {
        return false;
    };
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default()
        >= ttl
}
