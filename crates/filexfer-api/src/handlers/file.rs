//! File handlers: listing, chunked upload, merge and range-aware download.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use bytes::Bytes;

use filexfer_core::error::AppError;
use filexfer_storage::WrittenChunk;
use filexfer_storage::transfer::once;

use crate::dto::request::MergeRequest;
use crate::dto::response::{FileListResponse, MergeResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::FormFields;
use crate::handlers::download_response;
use crate::state::AppState;

/// GET /api/files
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.file_service.list_files().await?;
    Ok(Json(FileListResponse { files }))
}

/// POST /api/files (one chunk)
///
/// When `fileIdentifier` and `chunkNumber` precede the `file` part, the part
/// is streamed straight to disk; otherwise it is buffered until the form has
/// been read.
pub async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut identifier: Option<String> = None;
    let mut chunk_number: Option<String> = None;
    let mut part_name: Option<String> = None;
    let mut written: Option<WrittenChunk> = None;
    let mut buffered: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "fileIdentifier" => identifier = Some(field.text().await?),
            "chunkNumber" => chunk_number = Some(field.text().await?),
            "file" if written.is_none() && buffered.is_none() => {
                part_name = field.file_name().map(str::to_owned);
                match (identifier.as_deref(), chunk_number.as_deref()) {
                    (Some(id), Some(n)) => {
                        written = Some(state.upload_service.upload_chunk(id, n, field).await?);
                    }
                    _ => buffered = Some(field.bytes().await?),
                }
            }
            _ => {}
        }
    }

    let identifier =
        identifier.ok_or_else(|| AppError::validation("fileIdentifier is required"))?;
    let chunk_number =
        chunk_number.ok_or_else(|| AppError::validation("chunkNumber is required"))?;
    let written = match (written, buffered) {
        (Some(written), _) => written,
        (None, Some(data)) => {
            state
                .upload_service
                .upload_chunk(&identifier, &chunk_number, once(data))
                .await?
        }
        (None, None) => {
            return Err(AppError::validation("get form err: no file part in request").into());
        }
    };

    Ok(Json(MessageResponse::new(format!(
        "Chunk {} for {} uploaded successfully",
        written.sequence,
        part_name.as_deref().unwrap_or(&identifier)
    ))))
}

/// POST /api/files/merge
pub async fn merge_file(
    State(state): State<AppState>,
    FormFields(fields): FormFields,
) -> Result<Json<MergeResponse>, ApiError> {
    let req = MergeRequest::from_fields(fields)?;

    let merged = state
        .upload_service
        .merge(&req.file_identifier, &req.filename, &req.total_chunks)
        .await?;

    Ok(Json(MergeResponse {
        message: "File merged successfully".to_string(),
        filename: merged.filename,
        size: merged.bytes,
    }))
}

/// GET|HEAD /api/files/{filename}
pub async fn download_file(
    State(state): State<AppState>,
    method: Method,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let download = state
        .download_service
        .download(&filename, &headers, method == Method::HEAD)
        .await?;
    Ok(download_response(download))
}
