//! Shared helpers for the HTTP integration tests.
//!
//! The router is the one production builds, backed by the in-memory store and
//! a temporary uploads directory.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use api_lib::adapters::{LocalPhotoStorage, MemoryStore};
use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request, Response};
use axum::Router;
use citizen_registry_core::ports::CitizenStore;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PHOTO_BASE_URL: &str = "http://localhost:5000/uploads";

pub struct TestApp {
    pub router: Router,
    /// Kept alive for the duration of the test; dropped with the app.
    pub uploads: TempDir,
}

impl TestApp {
    pub fn uploads_dir(&self) -> &Path {
        self.uploads.path()
    }

    /// Names of the files currently in the uploads directory, sorted.
    pub fn uploaded_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.uploads.path())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

pub fn test_config(uploads_dir: &Path) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        db_max_connections: 1,
        log_level: tracing::Level::INFO,
        uploads_dir: uploads_dir.to_path_buf(),
        photo_base_url: PHOTO_BASE_URL.to_string(),
        cors_origin: "http://localhost:3000".to_string(),
    }
}

/// Build the full application router over an in-memory store.
pub fn build_test_app() -> TestApp {
    build_test_app_with_store(Arc::new(MemoryStore::new()))
}

/// Build the full application router over the given store.
pub fn build_test_app_with_store(store: Arc<dyn CitizenStore>) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let config = test_config(uploads.path());
    let state = AppState {
        store,
        photos: Arc::new(LocalPhotoStorage::new(uploads.path())),
        config: Arc::new(config),
    };
    let router = build_router(Arc::new(state)).unwrap();
    TestApp { router, uploads }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// A hand-assembled multipart/form-data body.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----citizen-registry-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn fields(self, pairs: &[(&str, &str)]) -> Self {
        pairs
            .iter()
            .fold(self, |body, (name, value)| body.text(name, value))
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, method: Method, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// The registration used throughout the scenarios.
pub fn asha_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Asha"),
        ("phoneNumber", "9999999999"),
        ("fatherName", "Ram"),
        ("age", "30"),
        ("address", "X"),
        ("nationalIdNumber", "123456789012"),
        ("purpose", "visit"),
        ("state", "UP"),
    ]
}

/// Same as `asha_fields` with some values overridden.
pub fn fields_with(overrides: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
    asha_fields()
        .into_iter()
        .map(|(name, value)| {
            overrides
                .iter()
                .find(|(n, _)| *n == name)
                .map_or((name, value), |&(n, v)| (n, v))
        })
        .collect()
}

pub async fn create(app: &TestApp, fields: &[(&str, &str)]) -> Response<Body> {
    let request = MultipartBody::new()
        .fields(fields)
        .into_request(Method::POST, "/api/citizen");
    send(app, request).await
}

/// Registers a citizen and returns the created record's JSON.
pub async fn create_ok(app: &TestApp, fields: &[(&str, &str)]) -> Value {
    let response = create(app, fields).await;
    assert_eq!(response.status(), 201);
    body_json(response).await["data"].clone()
}
