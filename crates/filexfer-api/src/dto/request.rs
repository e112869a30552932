//! Request DTOs with validation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use filexfer_core::error::AppError;

/// Form fields of a merge request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MergeRequest {
    /// Upload session identifier.
    #[serde(rename = "fileIdentifier")]
    #[validate(length(min = 1, message = "fileIdentifier is required"))]
    pub file_identifier: String,
    /// Name of the merged file.
    #[validate(length(min = 1, message = "filename is required"))]
    pub filename: String,
    /// Number of chunks to merge.
    #[serde(rename = "totalChunks")]
    #[validate(length(min = 1, message = "Invalid totalChunks"))]
    pub total_chunks: String,
}

impl MergeRequest {
    /// Build from decoded form fields and validate presence.
    pub fn from_fields(mut fields: HashMap<String, String>) -> Result<Self, AppError> {
        let request = Self {
            file_identifier: fields.remove("fileIdentifier").unwrap_or_default(),
            filename: fields.remove("filename").unwrap_or_default(),
            total_chunks: fields.remove("totalChunks").unwrap_or_default(),
        };
        request
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;
        Ok(request)
    }
}
