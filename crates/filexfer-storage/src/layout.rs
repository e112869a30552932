//! Storage root layout and path-segment validation.
//!
//! ```text
//! <root>/<filename>                  finished files
//! <root>/tmp/<identifier>/<n>        chunks of an in-flight upload
//! <root>/tmp/.<kind>-<uuid>.part     staging files, renamed into place
//! ```
//!
//! Every client-supplied name passes through [`validate_segment`] before it
//! is joined onto the root.

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use filexfer_core::error::{AppError, ErrorKind};
use filexfer_core::result::AppResult;

/// Name of the scratch directory under the root.
pub const SCRATCH_DIR: &str = "tmp";

/// Suffix of files that are still being written.
pub const PART_SUFFIX: &str = ".part";

const MAX_SEGMENT_LEN: usize = 255;

/// The directory every operation works in.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    root: PathBuf,
}

impl StorageRoot {
    /// Open the storage root, creating it (and the scratch area) if absent.
    pub async fn open(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(root.join(SCRATCH_DIR)).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// The root directory itself.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The scratch directory holding upload sessions.
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    /// Path of a finished file. Rejects unsafe names and the reserved `tmp`.
    pub fn file_path(&self, filename: &str) -> AppResult<PathBuf> {
        let name = validate_segment("filename", filename)?;
        if name == SCRATCH_DIR {
            return Err(AppError::validation(format!(
                "filename '{SCRATCH_DIR}' is reserved"
            )));
        }
        Ok(self.root.join(name))
    }

    /// Scratch directory of one upload session.
    pub fn session_dir(&self, identifier: &str) -> AppResult<PathBuf> {
        let id = validate_segment("fileIdentifier", identifier)?;
        Ok(self.scratch_dir().join(id))
    }

    /// Path of chunk `sequence` inside a session directory.
    pub fn chunk_path(session_dir: &Path, sequence: u32) -> PathBuf {
        session_dir.join(sequence.to_string())
    }

    /// A fresh, unique staging path under the scratch directory.
    pub fn staging_path(&self, kind: &str) -> PathBuf {
        self.scratch_dir()
            .join(format!(".{kind}-{}{PART_SUFFIX}", Uuid::new_v4()))
    }
}

/// Check that `value` is a single, harmless path segment.
pub fn validate_segment<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if value.len() > MAX_SEGMENT_LEN {
        return Err(AppError::validation(format!(
            "{field} exceeds {MAX_SEGMENT_LEN} bytes"
        )));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(AppError::validation(format!(
            "{field} must not contain path separators or parent references"
        )));
    }
    Ok(value)
}

/// Parse a 1-based chunk sequence number.
pub fn parse_sequence(field: &str, value: &str) -> AppResult<u32> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::validation(format!(
            "{field} must be a positive integer, got '{value}'"
        ))),
    }
}
