#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

use folio_cms::config::{Config, MediaDriver};
use folio_cms::services::auth::{self, NewUser, ADMIN_ROLE, EDITOR_ROLE};
use folio_cms::state::AppState;

pub const MEDIA_URL: &str = "http://localhost:3000/storage";
pub const PASSWORD: &str = "correct-horse-battery";

/// An in-process application over a throwaway SQLite database and media root.
pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub media_root: PathBuf,
    _dir: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let media_root = dir.path().join("storage");
        std::fs::create_dir_all(&media_root)?;

        let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let db = Database::connect(&database_url).await?;
        Migrator::up(&db, None).await?;
        auth::seed_defaults(&db).await?;

        let config = Config {
            database_url,
            host: "127.0.0.1".into(),
            port: 0,
            app_url: "http://localhost:3000".into(),
            cors_origins: vec!["http://localhost:5173".into()],
            media: MediaDriver::Local {
                root: media_root.clone(),
            },
            media_public_url: None,
            token_ttl_hours: None,
            max_upload_bytes: 60 * 1024 * 1024,
        };
        let media = folio_cms::media_store(&config).await;
        let router = folio_cms::routes::create_routes(AppState::new(db.clone(), media, config));

        Ok(Self {
            router,
            db,
            media_root,
            _dir: dir,
        })
    }

    pub async fn create_user(&self, email: &str, role: &str, is_active: bool) -> Result<i32> {
        let user = auth::create_user(
            &self.db,
            NewUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                is_active,
                roles: vec![role.to_string()],
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!("create_user failed: {e}"))?;
        Ok(user.id)
    }

    pub async fn login(&self, email: &str) -> Result<String> {
        let res = self
            .json(Method::POST, "/login", None, serde_json::json!({ "email": email, "password": PASSWORD }))
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "login failed: {}", res.body);
        res.body["token"]
            .as_str()
            .map(str::to_string)
            .context("no token in login response")
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.create_user("admin@example.com", ADMIN_ROLE, true).await?;
        self.login("admin@example.com").await
    }

    pub async fn editor_token(&self) -> Result<String> {
        self.create_user("editor@example.com", EDITOR_ROLE, true).await?;
        self.login("editor@example.com").await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(Response { status, body })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<Response> {
        self.send(request(Method::GET, uri, token).body(Body::empty())?).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<Response> {
        self.send(request(Method::DELETE, uri, token).body(Body::empty())?).await
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> Result<Response> {
        let req = request(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(req).await
    }

    pub async fn multipart(&self, method: Method, uri: &str, token: Option<&str>, form: Multipart) -> Result<Response> {
        let req = request(method, uri, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", Multipart::BOUNDARY),
            )
            .body(Body::from(form.finish()))?;
        self.send(req).await
    }

    /// Whether a public media URL points at a file present on disk.
    pub fn stored(&self, url: &Value) -> bool {
        url.as_str()
            .and_then(|u| u.strip_prefix(MEDIA_URL))
            .map(|path| self.media_root.join(path.trim_start_matches('/')))
            .is_some_and(|p| p.is_file())
    }

    pub fn files_in(&self, dir: &str) -> usize {
        count_files(&self.media_root.join(dir))
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.flatten().filter(|e| e.path().is_file()).count())
        .unwrap_or(0)
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// Hand-assembled `multipart/form-data` body.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    const BOUNDARY: &'static str = "folio-test-boundary";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());
        self.body
    }
}

/// Bytes that sniff as a JPEG.
pub fn jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(512, 0);
    data
}

pub fn png() -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.resize(256, 0);
    data
}
