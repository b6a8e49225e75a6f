#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;
use tower::ServiceExt;

use fitmat::{
    api::{self, state::AppState},
    auth,
    config::Settings,
    domain::*,
    email::{Mailer, RecordingMailer},
    payments::{FakePaymentGateway, PaymentGateway},
    repository::{
        CategoryRepository, ClassRepository, SqliteCategoryRepository, SqliteClassRepository,
        SqliteUserRepository, UserRepository,
    },
    service::ServiceContext,
    test_support::test_pool,
};

pub const PASSWORD: &str = "password123";
pub const MULTIPART_BOUNDARY: &str = "fitmat-test-boundary";

pub struct TestApp {
    pub pool: SqlitePool,
    pub services: Arc<ServiceContext>,
    pub router: Router,
    pub gateway: Arc<FakePaymentGateway>,
    pub mailer: Arc<RecordingMailer>,
    pub settings: Settings,
    // Keeps an on-disk database alive for the lifetime of the app.
    _dir: Option<TempDir>,
}

/// Pool over a fresh database file inside `dir`, migrated. Unlike the
/// in-memory pool, connections here are separate and can contend.
pub async fn file_pool(dir: &TempDir, max_connections: u32) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("fitmat.db"))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(test_pool().await, None, true, true).await
    }

    /// App with neither a payment gateway nor a mailer wired in.
    pub async fn unconfigured() -> Self {
        Self::build(test_pool().await, None, false, false).await
    }

    /// App backed by a database file with a multi-connection pool.
    pub async fn on_disk(max_connections: u32) -> Self {
        let dir = TempDir::new().unwrap();
        let pool = file_pool(&dir, max_connections).await;
        Self::build(pool, Some(dir), true, true).await
    }

    async fn build(
        pool: SqlitePool,
        dir: Option<TempDir>,
        with_gateway: bool,
        with_mailer: bool,
    ) -> Self {
        let settings = Settings::default();
        let gateway = Arc::new(FakePaymentGateway::new());
        let mailer = Arc::new(RecordingMailer::new());

        let gateway_handle: Option<Arc<dyn PaymentGateway>> = if with_gateway {
            Some(gateway.clone())
        } else {
            None
        };
        let mailer_handle: Option<Arc<dyn Mailer>> = if with_mailer {
            Some(mailer.clone())
        } else {
            None
        };

        let services = Arc::new(ServiceContext::new(
            pool.clone(),
            &settings,
            gateway_handle,
            mailer_handle,
        ));
        let router = api::create_app(AppState::new(services.clone(), Arc::new(settings.clone())));

        Self {
            pool,
            services,
            router,
            gateway,
            mailer,
            settings,
            _dir: dir,
        }
    }

    pub async fn user(&self, email: &str, role: Role) -> User {
        SqliteUserRepository::new(self.pool.clone())
            .create(CreateUserRequest {
                email: email.to_string(),
                password_hash: auth::hash_password(PASSWORD).unwrap(),
                name: Some(email.split('@').next().unwrap_or_default().to_string()),
                role,
            })
            .await
            .unwrap()
    }

    pub async fn role_of(&self, user_id: i64) -> Role {
        SqliteUserRepository::new(self.pool.clone())
            .find_by_id(user_id)
            .await
            .unwrap()
            .unwrap()
            .role
    }

    pub fn token(&self, user: &User) -> String {
        self.services.user_service.tokens().issue(user).unwrap()
    }

    pub async fn category(&self, name: &str) -> ClassCategory {
        SqliteCategoryRepository::new(self.pool.clone())
            .create(name, None)
            .await
            .unwrap()
    }

    /// Insert a class directly, bypassing the service-level checks.
    pub async fn class(&self, trainer: &User, spec: ClassSpec) -> Class {
        SqliteClassRepository::new(self.pool.clone())
            .create(NewClass {
                title: spec.title.to_string(),
                description: None,
                start_time: spec.start,
                end_time: spec.start + Duration::hours(1),
                capacity: spec.capacity,
                required_role: spec.required_role,
                trainer_id: trainer.id,
                created_by_id: trainer.id,
                category_id: spec.category_id,
            })
            .await
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::PUT, uri, token, Some(body))).await
    }
}

pub struct ClassSpec {
    pub title: &'static str,
    pub start: DateTime<Utc>,
    pub capacity: Option<i64>,
    pub required_role: Option<Role>,
    pub category_id: Option<i64>,
}

impl Default for ClassSpec {
    fn default() -> Self {
        Self {
            title: "Morning Flow",
            start: Utc::now() + Duration::days(1),
            capacity: None,
            required_role: None,
            category_id: None,
        }
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Hand-built multipart body. `file` is `(field, filename, bytes)`.
pub fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                MULTIPART_BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                MULTIPART_BOUNDARY, name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/payment")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn message(body: &Value) -> &str {
    body["message"].as_str().unwrap_or_default()
}
