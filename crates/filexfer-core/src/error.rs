//! Unified application error types for filexfer.
//!
//! Every crate maps its failures into [`AppError`] so that errors propagate
//! with `?` all the way to the HTTP boundary, where the API crate turns the
//! [`ErrorKind`] into a status code.

use std::fmt;

use thiserror::Error;

/// Error categories surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A request argument was missing or malformed.
    Validation,
    /// The requested file or directory does not exist.
    NotFound,
    /// A merge could not find an expected chunk.
    ChunkMissing,
    /// Filesystem I/O failed.
    Storage,
    /// No requested byte range overlaps the file, or the range was malformed.
    RangeNotSatisfiable,
    /// A conditional request header did not hold.
    PreconditionFailed,
    /// Configuration could not be loaded.
    Configuration,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::ChunkMissing => "CHUNK_MISSING",
            Self::Storage => "STORAGE_UNAVAILABLE",
            Self::RangeNotSatisfiable => "RANGE_NOT_SATISFIABLE",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::Configuration => "CONFIGURATION",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The unified application error used throughout filexfer.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Structured details for the client (chunk number, file size, ...).
    pub details: Option<serde_json::Value>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: Some(Box::new(source)),
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a validation (bad argument) error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a chunk-missing error for the given sequence number.
    pub fn chunk_missing(sequence: u32) -> Self {
        Self::new(ErrorKind::ChunkMissing, format!("Could not open chunk {sequence}"))
            .with_details(serde_json::json!({ "chunk": sequence }))
    }

    /// Create a range-not-satisfiable error for a file of `size` bytes.
    pub fn range_not_satisfiable(size: u64) -> Self {
        Self::new(ErrorKind::RangeNotSatisfiable, "Requested range not satisfiable")
            .with_details(serde_json::json!({ "size": size }))
    }

    /// Create a precondition-failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// File size carried by a [`ErrorKind::RangeNotSatisfiable`] error.
    pub fn unsatisfiable_size(&self) -> Option<u64> {
        if self.kind != ErrorKind::RangeNotSatisfiable {
            return None;
        }
        self.details.as_ref()?.get("size")?.as_u64()
    }

    /// Whether this error should be reported as a server fault.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ChunkMissing
                | ErrorKind::Storage
                | ErrorKind::Configuration
                | ErrorKind::Internal
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            details: self.details.clone(),
            source: None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
