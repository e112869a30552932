//! Integration tests for the range-aware and simple download endpoints.

mod helpers;

use axum::body::Body;
use axum::http::{StatusCode, header};

use helpers::{MultipartForm, TestApp};

const CONTENT: &[u8] = b"hello range request";

async fn app_with_file() -> TestApp {
    let app = TestApp::new().await;
    app.seed("test.txt", CONTENT);
    app
}

#[tokio::test]
async fn test_full_download() {
    let app = app_with_file().await;

    let response = app.get("/api/files/test.txt", &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_ref(), CONTENT);
    assert_eq!(response.header(header::CONTENT_LENGTH), Some("19"));
    assert_eq!(response.header(header::ACCEPT_RANGES), Some("bytes"));
    assert!(response.header(header::ETAG).is_some());
    assert!(response.header(header::LAST_MODIFIED).is_some());
}

#[tokio::test]
async fn test_range_download() {
    let app = app_with_file().await;

    let response = app
        .get("/api/files/test.txt", &[("range", "bytes=6-10")])
        .await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.text(), "range");
    assert_eq!(response.header(header::CONTENT_RANGE), Some("bytes 6-10/19"));
    assert_eq!(response.header(header::CONTENT_LENGTH), Some("5"));
}

#[tokio::test]
async fn test_suffix_range() {
    let app = app_with_file().await;

    let response = app.get("/api/files/test.txt", &[("range", "bytes=-7")]).await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.text(), "request");
}

#[tokio::test]
async fn test_multi_range_download() {
    let app = app_with_file().await;

    let response = app
        .get("/api/files/test.txt", &[("range", "bytes=0-4,12-18")])
        .await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    let content_type = response.header(header::CONTENT_TYPE).unwrap();
    assert!(content_type.starts_with("multipart/byteranges; boundary="));
    let body = response.text();
    assert!(body.contains("Content-Range: bytes 0-4/19\r\n\r\nhello\r\n"));
    assert!(body.contains("Content-Range: bytes 12-18/19\r\n\r\nrequest\r\n"));
}

#[tokio::test]
async fn test_unsatisfiable_range() {
    let app = app_with_file().await;

    for range in ["bytes=100-200", "bytes=5-1", "bytes=abc"] {
        let response = app.get("/api/files/test.txt", &[("range", range)]).await;

        assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE, "{range}");
        assert_eq!(response.header(header::CONTENT_RANGE), Some("bytes */19"));
        assert!(response.body.is_empty());
    }
}

#[tokio::test]
async fn test_conditional_get() {
    let app = app_with_file().await;
    let first = app.get("/api/files/test.txt", &[]).await;
    let etag = first.header(header::ETAG).unwrap().to_string();

    let response = app
        .get("/api/files/test.txt", &[("if-none-match", etag.as_str())])
        .await;
    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
    assert!(response.body.is_empty());

    let response = app
        .get("/api/files/test.txt", &[("if-match", "\"something-else\"")])
        .await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_head_request() {
    let app = app_with_file().await;

    let response = app
        .request("HEAD", "/api/files/test.txt", &[], Body::empty())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_LENGTH), Some("19"));
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_download_missing_file() {
    let app = TestApp::new().await;

    let response = app.get("/api/files/absent.txt", &[]).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "File not found");
    assert_eq!(response.json()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let app = TestApp::new().await;

    let response = app.get("/api/files/..", &[]).await;
    assert_ne!(response.status, StatusCode::OK);

    let response = app.get("/api/files/..%2Fsecret", &[]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_simple_upload() {
    let app = TestApp::new().await;
    let form = MultipartForm::new().file("file", "test.txt", b"hello world");

    let response = app.post_multipart("/api/simple/upload", form).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["message"],
        "File test.txt uploaded successfully"
    );
    assert_eq!(
        std::fs::read(app.root().join("test.txt")).unwrap(),
        b"hello world"
    );
}

#[tokio::test]
async fn test_simple_upload_without_file() {
    let app = TestApp::new().await;
    let form = MultipartForm::new().text("other", "value");

    let response = app.post_multipart("/api/simple/upload", form).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_simple_download() {
    let app = app_with_file().await;

    let response = app.get("/api/simple/download/test.txt", &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_ref(), CONTENT);
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        Some("attachment; filename=test.txt")
    );
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        Some("application/octet-stream")
    );
    assert_eq!(
        response.headers.get("content-description").unwrap(),
        "File Transfer"
    );
    assert_eq!(
        response.headers.get("content-transfer-encoding").unwrap(),
        "binary"
    );
}

#[tokio::test]
async fn test_simple_download_missing_file() {
    let app = TestApp::new().await;

    let response = app.get("/api/simple/download/absent.txt", &[]).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "File not found");
}
