#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use wheelhouse::auth::{PasswordHasher, issue_token};
use wheelhouse::config::Settings;
use wheelhouse::server::{AppState, create_router};
use wheelhouse::store::{SqliteStore, Store};
use wheelhouse::types::{Capability, User};

pub const SECRET: &str = "integration-test-secret";
pub const BOUNDARY: &str = "wheelhouse-test-boundary";

pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    router: Router,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("parse JSON body")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("utf-8 body")
    }
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");

        let mut settings = Settings::default();
        settings.core.secret_key = SECRET.to_string();
        settings.database.path = temp_dir.path().join("wheelhouse.db");
        settings.packages.directory = temp_dir.path().join("packages");

        let store = SqliteStore::new(&settings.database.path).expect("open store");
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState::new(Arc::new(store), settings));
        let router = create_router(state.clone());

        Self {
            temp_dir,
            state,
            router,
        }
    }

    /// Creates an active user whose password verifies quickly.
    pub fn user(&self, username: &str, password: &str, capabilities: &[Capability]) -> User {
        let mut user = User::new(username);
        user.is_active = true;
        for capability in capabilities {
            user.set(*capability, true);
        }
        user.password = PasswordHasher::with_iterations(1024)
            .expect("hasher")
            .hash(password, SECRET)
            .expect("hash password");
        self.state.store.create_user(&user).expect("create user");
        user
    }

    pub fn admin(&self) -> User {
        self.user("admin", "admin-pass", &Capability::ALL)
    }

    pub fn token(&self, user: &User) -> String {
        issue_token(&user.id, SECRET, chrono::Duration::hours(1)).expect("issue token")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, authorization: Option<&str>) -> Response {
        let mut builder = Request::get(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty()).expect("build request"))
            .await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        authorization: Option<&str>,
        body: Value,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(
            builder
                .body(Body::from(body.to_string()))
                .expect("build request"),
        )
        .await
    }

    pub async fn upload(&self, authorization: &str, form: &UploadRequest<'_>) -> Response {
        let request = Request::post("/")
            .header(header::AUTHORIZATION, authorization)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.encode()))
            .expect("build request");
        self.send(request).await
    }
}

pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// A twine-style `file_upload` form.
pub struct UploadRequest<'a> {
    pub action: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub filename: &'a str,
    pub content: &'a [u8],
    pub license: &'a str,
    pub classifiers: Vec<&'a str>,
}

impl<'a> UploadRequest<'a> {
    pub fn new(name: &'a str, version: &'a str, filename: &'a str, content: &'a [u8]) -> Self {
        Self {
            action: "file_upload",
            name,
            version,
            filename,
            content,
            license: "",
            classifiers: Vec::new(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        let mut text = |name: &str, value: &str| {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        };

        text(":action", self.action);
        text("protocol_version", "1");
        text("name", self.name);
        text("version", self.version);
        text("summary", "A test package");
        if !self.license.is_empty() {
            text("license", self.license);
        }
        for classifier in &self.classifiers {
            text("classifiers", classifier);
        }

        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"content\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(self.content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}
