//! HTTP request handlers.

pub mod file;
pub mod health;
pub mod simple;

use axum::body::Body;
use axum::response::{IntoResponse, Response};

use filexfer_service::{DownloadBody, DownloadResponse};

/// Turn a computed download into an HTTP response.
pub(crate) fn download_response(download: DownloadResponse) -> Response {
    let body = match download.body {
        DownloadBody::Empty => Body::empty(),
        DownloadBody::Stream(stream) => Body::from_stream(stream),
    };
    (download.status, download.headers, body).into_response()
}
