//! File download service: full, ranged and forced downloads.

use std::io::SeekFrom;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;
use tracing::debug;

use filexfer_core::error::{AppError, ErrorKind};
use filexfer_core::result::AppResult;
use filexfer_storage::StorageManager;

use crate::http::conditional::{Precondition, Validators};
use crate::http::range::{self, ByteRange, Multipart};

const OCTET_STREAM: &str = "application/octet-stream";

/// Body of a download response.
pub enum DownloadBody {
    /// No body (HEAD, 304).
    Empty,
    /// Streamed file content.
    Stream(BoxStream<'static, std::io::Result<Bytes>>),
}

impl std::fmt::Debug for DownloadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Status, headers and body of a download, ready to be sent.
#[derive(Debug)]
pub struct DownloadResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: DownloadBody,
}

/// Serves finished files.
#[derive(Debug, Clone)]
pub struct DownloadService {
    /// Storage manager.
    storage: Arc<StorageManager>,
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(storage: Arc<StorageManager>) -> Self {
        Self { storage }
    }

    /// Serve `filename`, honoring `Range`, `If-Range` and the conditional
    /// request headers in `request`.
    ///
    /// With `head_only` the status and headers are computed as for GET but
    /// the body is empty.
    pub async fn download(
        &self,
        filename: &str,
        request: &HeaderMap,
        head_only: bool,
    ) -> AppResult<DownloadResponse> {
        let stored = self.storage.files().open(filename).await?;
        let size = stored.size;
        let validators = Validators::new(stored.modified, size);
        let content_type = mime_guess::from_path(&stored.name)
            .first_raw()
            .unwrap_or(OCTET_STREAM);

        let mut headers = HeaderMap::new();
        insert(&mut headers, header::ETAG, &validators.etag)?;
        insert(&mut headers, header::LAST_MODIFIED, &validators.last_modified())?;
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        match validators.evaluate(request) {
            Precondition::Proceed => {}
            Precondition::NotModified => {
                return Ok(DownloadResponse {
                    status: StatusCode::NOT_MODIFIED,
                    headers,
                    body: DownloadBody::Empty,
                });
            }
            Precondition::Failed => {
                return Err(AppError::precondition_failed(format!(
                    "Precondition failed for {filename}"
                )));
            }
        }

        let range_header = request
            .get(header::RANGE)
            .filter(|_| validators.range_allowed(request))
            .map(|v| {
                v.to_str()
                    .map_err(|_| AppError::range_not_satisfiable(size))
            })
            .transpose()?;
        let mut ranges = match range_header {
            Some(value) => range::parse_range(value, size)?,
            None => Vec::new(),
        };
        if range::total_length(&ranges) > size {
            // Overlapping ranges that add up to more than the file.
            ranges.clear();
        }

        let mut file = stored.file;
        match ranges.as_slice() {
            [] => {
                debug!(filename, size, "Serving full file");
                insert(&mut headers, header::CONTENT_TYPE, content_type)?;
                insert(&mut headers, header::CONTENT_LENGTH, &size.to_string())?;
                let body = if head_only {
                    DownloadBody::Empty
                } else {
                    DownloadBody::Stream(ReaderStream::new(file).boxed())
                };
                Ok(DownloadResponse {
                    status: StatusCode::OK,
                    headers,
                    body,
                })
            }
            [single] => {
                debug!(filename, start = single.start, end = single.end(), "Serving byte range");
                insert(&mut headers, header::CONTENT_TYPE, content_type)?;
                insert(&mut headers, header::CONTENT_RANGE, &single.content_range(size))?;
                insert(&mut headers, header::CONTENT_LENGTH, &single.length.to_string())?;
                let body = if head_only {
                    DownloadBody::Empty
                } else {
                    file.seek(SeekFrom::Start(single.start)).await.map_err(|e| {
                        AppError::with_source(ErrorKind::Storage, "Failed to seek file", e)
                    })?;
                    DownloadBody::Stream(ReaderStream::new(file.take(single.length)).boxed())
                };
                Ok(DownloadResponse {
                    status: StatusCode::PARTIAL_CONTENT,
                    headers,
                    body,
                })
            }
            many => {
                debug!(filename, parts = many.len(), "Serving multiple byte ranges");
                let layout = Multipart::new();
                let length = layout.content_length(many, content_type, size);
                insert(&mut headers, header::CONTENT_TYPE, &layout.content_type())?;
                insert(&mut headers, header::CONTENT_LENGTH, &length.to_string())?;
                let body = if head_only {
                    DownloadBody::Empty
                } else {
                    DownloadBody::Stream(multipart_stream(file, many, &layout, content_type, size))
                };
                Ok(DownloadResponse {
                    status: StatusCode::PARTIAL_CONTENT,
                    headers,
                    body,
                })
            }
        }
    }

    /// Serve `filename` as an attachment without range support.
    pub async fn simple_download(&self, filename: &str) -> AppResult<DownloadResponse> {
        let stored = self.storage.files().open(filename).await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("content-description"),
            HeaderValue::from_static("File Transfer"),
        );
        headers.insert(
            HeaderName::from_static("content-transfer-encoding"),
            HeaderValue::from_static("binary"),
        );
        insert(
            &mut headers,
            header::CONTENT_DISPOSITION,
            &format!("attachment; filename={}", stored.name),
        )?;
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
        insert(&mut headers, header::CONTENT_LENGTH, &stored.size.to_string())?;

        Ok(DownloadResponse {
            status: StatusCode::OK,
            headers,
            body: DownloadBody::Stream(ReaderStream::new(stored.file).boxed()),
        })
    }
}

/// Produce each part lazily, streaming its bytes from a clone of `file`.
///
/// Parts are consumed one after another, so the clones never read
/// concurrently even though they share a cursor.
fn multipart_stream(
    file: File,
    ranges: &[ByteRange],
    layout: &Multipart,
    content_type: &str,
    size: u64,
) -> BoxStream<'static, std::io::Result<Bytes>> {
    let parts: Vec<(ByteRange, Bytes)> = ranges
        .iter()
        .map(|r| (*r, Bytes::from(layout.part_header(r, content_type, size))))
        .collect();
    let trailer = Bytes::from_static(layout.part_trailer().as_bytes());
    let closing = Bytes::from(layout.closing());

    stream::unfold((file, parts.into_iter()), move |(file, mut parts)| {
        let trailer = trailer.clone();
        async move {
            let (range, header) = parts.next()?;
            let part = match open_part(&file, &range).await {
                Ok(reader) => stream::once(async move { Ok(header) })
                    .chain(ReaderStream::new(reader))
                    .chain(stream::once(async move { Ok(trailer) }))
                    .boxed(),
                Err(e) => stream::once(async move { Err(e) }).boxed(),
            };
            Some((part, (file, parts)))
        }
    })
    .flatten()
    .chain(stream::once(async move { Ok(closing) }))
    .boxed()
}

async fn open_part(file: &File, range: &ByteRange) -> std::io::Result<Take<File>> {
    let mut handle = file.try_clone().await?;
    handle.seek(SeekFrom::Start(range.start)).await?;
    Ok(handle.take(range.length))
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Invalid response header", e))?;
    headers.insert(name, value);
    Ok(())
}
