//! Test helpers for HTTP API tests.
//!
//! Builds the full router over an in-memory database, an in-process
//! key-value store and a temporary storage directory.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::http::header::HeaderName;
use axum::http::StatusCode;
use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tempfile::TempDir;

use files_manager::cache::MemoryStore;
use files_manager::file::FileStorage;
use files_manager::web::{create_router, AppState};
use files_manager::worker::{JobReceiver, ThumbnailQueue};
use files_manager::Database;

/// Session token header.
pub const X_TOKEN: HeaderName = HeaderName::from_static("x-token");

/// A running test application.
pub struct TestApp {
    /// HTTP test client.
    pub server: TestServer,
    /// Shared state behind the router.
    pub state: Arc<AppState>,
    /// Consumer side of the thumbnail queue.
    pub jobs: Option<JobReceiver>,
    /// Storage root, removed on drop.
    pub dir: TempDir,
}

/// Create a test application.
pub async fn create_test_app() -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let (queue, jobs) = ThumbnailQueue::new(3);

    let state = Arc::new(AppState::new(
        Arc::new(db),
        Arc::new(MemoryStore::new()),
        FileStorage::new(dir.path().join("files_manager")),
        queue,
    ));
    let server = TestServer::new(create_router(state.clone())).expect("Failed to create test server");

    TestApp {
        server,
        state,
        jobs: Some(jobs),
        dir,
    }
}

/// `Authorization` header value for Basic credentials.
pub fn basic_auth(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{email}:{password}")))
}

/// Register a user and return the response body.
pub async fn register_test_user(server: &TestServer, email: &str, password: &str) -> Value {
    let response = server
        .post("/users")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

/// Log in and return the session token.
pub async fn connect(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .get("/connect")
        .add_header(
            axum::http::header::AUTHORIZATION,
            basic_auth(email, password),
        )
        .await;
    response.assert_status_ok();
    response.json::<Value>()["token"]
        .as_str()
        .expect("token in response")
        .to_string()
}

/// Register and log in, returning the session token.
pub async fn register_and_connect(server: &TestServer, email: &str, password: &str) -> String {
    register_test_user(server, email, password).await;
    connect(server, email, password).await
}

/// Upload an entry and return the response body.
pub async fn upload(server: &TestServer, token: &str, body: Value) -> Value {
    let response = server
        .post("/files")
        .add_header(X_TOKEN, token.to_string())
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

/// Base64 of a `width` x `height` PNG.
pub fn png_base64(width: u32, height: u32) -> String {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode PNG");
    STANDARD.encode(out.into_inner())
}
