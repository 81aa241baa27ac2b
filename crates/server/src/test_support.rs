use std::path::PathBuf;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app,
    config::DEFAULT_MAX_UPLOAD_BYTES,
    db::Database,
    middleware::auth::SESSION_COOKIE,
    services::{credentials, sessions::SessionStore, storage::StorageService},
    AppState,
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Full router over an in-memory database and a throwaway upload directory,
/// with the bootstrap admin account in place.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    upload_dir: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_upload_limit(DEFAULT_MAX_UPLOAD_BYTES).await
    }

    pub async fn with_upload_limit(max_upload_bytes: usize) -> Self {
        let db = Database::in_memory().await.unwrap();
        credentials::ensure_admin(&db.pool, ADMIN_USERNAME, "admin@example.com", ADMIN_PASSWORD)
            .await
            .unwrap();

        let upload_dir = std::env::temp_dir().join(format!("lms-test-{}", Uuid::new_v4()));
        let storage = StorageService::new(&upload_dir);
        storage.init().await.unwrap();

        let state = AppState {
            db,
            sessions: SessionStore::new(chrono::Duration::hours(24)),
            storage,
            max_upload_bytes,
        };

        Self {
            router: app(state.clone()),
            state,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Posts credentials to `path` and returns the `Cookie` header value for
    /// the new session.
    pub async fn login(&self, path: &str, username: &str, password: &str) -> String {
        let res = self
            .post_form(path, &format!("username={username}&password={password}"), None)
            .await;
        session_cookie(&res).expect("login did not set a session cookie")
    }

    pub async fn login_admin(&self) -> String {
        self.login("/admin/login", ADMIN_USERNAME, ADMIN_PASSWORD).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

pub async fn json_body(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn session_cookie(res: &Response) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub const BOUNDARY: &str = "lms-test-boundary";

/// Builds a multipart body from text fields and an optional file part.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
