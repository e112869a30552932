//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use filexfer_api::{AppState, build_router};
use filexfer_core::config::AppConfig;
use filexfer_storage::{StorageManager, StorageRoot};

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application config
    pub config: AppConfig,
    /// Keeps the storage root alive for the test's duration
    dir: TempDir,
}

impl TestApp {
    /// Create a new test application over an empty storage root
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application after adjusting the default config
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.storage.root_path = dir.path().join("uploads").to_string_lossy().into_owned();
        config.server.static_dir = dir.path().join("static").to_string_lossy().into_owned();
        adjust(&mut config);

        let root = Arc::new(
            StorageRoot::open(&config.storage.root_path)
                .await
                .expect("Failed to open storage root"),
        );
        let storage = Arc::new(StorageManager::new(root, &config.upload));
        let router = build_router(AppState::new(config.clone(), storage));

        Self {
            router,
            config,
            dir,
        }
    }

    /// The storage root directory
    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.config.storage.root_path)
    }

    /// Write a file straight into the storage root
    pub fn seed(&self, name: &str, content: &[u8]) {
        std::fs::write(self.root().join(name), content).expect("Failed to seed file");
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Body,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let req = req.body(body).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET with optional extra headers
    pub async fn get(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, headers, Body::empty()).await
    }

    /// POST a multipart form
    pub async fn post_multipart(&self, path: &str, form: MultipartForm) -> TestResponse {
        let content_type = form.content_type();
        self.request(
            "POST",
            path,
            &[("content-type", content_type.as_str())],
            Body::from(form.finish()),
        )
        .await
    }

    /// POST an urlencoded form
    pub async fn post_urlencoded(&self, path: &str, body: &str) -> TestResponse {
        self.request(
            "POST",
            path,
            &[("content-type", "application/x-www-form-urlencoded")],
            Body::from(body.to_string()),
        )
        .await
    }

    /// Upload one chunk the way a browser client does
    pub async fn upload_chunk(&self, identifier: &str, number: &str, data: &[u8]) -> TestResponse {
        let form = MultipartForm::new()
            .text("fileIdentifier", identifier)
            .text("chunkNumber", number)
            .file("file", "blob", data);
        self.post_multipart("/api/files", form).await
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Bytes,
}

impl TestResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// A response header as a string
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Minimal `multipart/form-data` body builder
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "filexfer-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    /// Add a text field
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    /// Add a file part
    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}
