//! Single-shot upload and forced download.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::response::Response;

use filexfer_core::error::AppError;

use crate::dto::response::MessageResponse;
use crate::error::ApiError;
use crate::handlers::download_response;
use crate::state::AppState;

/// POST /api/simple/upload
pub async fn simple_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| AppError::validation("get form err: file part has no filename"))?;

        state.upload_service.upload_simple(&filename, field).await?;

        return Ok(Json(MessageResponse::new(format!(
            "File {filename} uploaded successfully"
        ))));
    }

    Err(AppError::validation("get form err: no file part in request").into())
}

/// GET /api/simple/download/{filename}
pub async fn simple_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let download = state.download_service.simple_download(&filename).await?;
    Ok(download_response(download))
}
