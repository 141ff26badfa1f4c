#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use sqlx::PgPool;
use tower::ServiceExt;

use intake_api::auth::jwt::JwtConfig;
use intake_api::auth::password::hash_password;
use intake_api::config::{AdminCredentials, ProviderEndpoints, ServerConfig};
use intake_api::router::build_app_router;
use intake_api::state::AppState;
use intake_cloud::memory::InMemoryStore;
use intake_core::crypto::FieldCipher;
use intake_core::otp::{OtpCache, DEFAULT_CACHE_CAPACITY};
use intake_db::bootstrap::{seed_defaults, BootstrapAdmin};
use intake_pipeline::llm::{ChatCompletion, LlmError};
use intake_pipeline::ocr::{OcrEngine, OcrError};
use intake_pipeline::IngestionPipeline;

pub const ADMIN_EMAIL: &str = "admin@intake.test";
pub const ADMIN_PASSWORD: &str = "Admin@123";
pub const TEST_SECRET: &str = "integration-test-secret";

/// Reply of the stub model for every document.
pub const MODEL_REPLY: &str = r#"```json
{"type_of_fax": "Referral", "demographics": {"first_name": "Ada", "DOB": "03/14/1961"}}
```"#;

/// Build a test `ServerConfig` with safe defaults.
///
/// The payload envelope is off so tests can speak plain JSON; the envelope
/// tests switch it back on through [`build_test_app_with`].
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-jwt-secret".to_string(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 2,
            reset_token_expiry_mins: 5,
        },
        secret_key: TEST_SECRET.to_string(),
        payload_encryption: false,
        otp_cache_ttl_secs: 300,
        bootstrap_admin: AdminCredentials {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        },
        s3: None,
        azure: None,
        llm: None,
        microsoft: None,
        dropbox: None,
        smtp: None,
        endpoints: ProviderEndpoints::default(),
    }
}

struct StubOcr;

#[async_trait]
impl OcrEngine for StubOcr {
    async fn extract_text(&self, _pdf: &[u8]) -> Result<String, OcrError> {
        Ok("--- Page 1 ---\nscanned referral".to_string())
    }
}

struct StubModel;

#[async_trait]
impl ChatCompletion for StubModel {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(MODEL_REPLY.to_string())
    }
}

/// Seed the default modules, super admin role and admin user.
pub async fn seed(pool: &PgPool) {
    let admin = BootstrapAdmin {
        email: ADMIN_EMAIL.to_string(),
        password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
        phone_number: None,
    };
    seed_defaults(pool, &admin).await.unwrap();
}

/// Application state over an in-memory store and stub OCR/model.
pub fn test_state(pool: PgPool, config: ServerConfig) -> AppState {
    AppState {
        pool,
        cipher: Arc::new(FieldCipher::new(&config.secret_key)),
        otp_cache: Arc::new(OtpCache::new(
            DEFAULT_CACHE_CAPACITY,
            Duration::from_secs(config.otp_cache_ttl_secs),
        )),
        config: Arc::new(config),
        storage: Some(Arc::new(InMemoryStore::new())),
        pipeline: Arc::new(IngestionPipeline::new(
            Arc::new(StubOcr),
            Some(Arc::new(StubModel)),
        )),
        http: reqwest::Client::new(),
        mailer: None,
    }
}

/// Seed the database and build the full application router with the
/// production middleware stack.
pub async fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config()).await
}

pub async fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    seed(&pool).await;
    let state = test_state(pool, config.clone());
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Log in through the API and return the access token.
pub async fn login(app: Router, email: &str, password: &str) -> String {
    let response = post_json(
        app,
        "/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["data"]["token"]["access"].as_str().unwrap().to_string()
}

pub async fn admin_token(app: Router) -> String {
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Id of a seeded module by path.
pub async fn module_id(pool: &PgPool, path: &str) -> i64 {
    let (id,): (i64,) =
        sqlx::query_as("SELECT id FROM modules WHERE path = $1 AND deleted_at IS NULL")
            .bind(path)
            .fetch_one(pool)
            .await
            .unwrap();
    id
}

/// Create a role through the API and return its id.
pub async fn create_role(app: Router, token: &str, body: serde_json::Value) -> i64 {
    let response = post_json_auth(app, "/api/roles", body, token).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// PDF fixtures
// ---------------------------------------------------------------------------

/// A PDF with one page per entry of `pages`, each showing its text.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
