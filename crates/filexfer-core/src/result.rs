//! Convenience result type alias for filexfer.

use crate::error::AppError;

/// A specialized `Result` type for filexfer operations.
pub type AppResult<T> = Result<T, AppError>;
