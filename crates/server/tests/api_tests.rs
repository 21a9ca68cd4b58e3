//! HTTP-level tests for the authentication and admin endpoints.

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::TestServer;
use common::{SECRET, StubProvider, build_state, seed_user, test_config};
use identity_core::api::router;
use identity_core::directory::{MemoryDirectory, UserDirectory};
use identity_core::entity::Role;
use identity_core::oauth::{Provider, ProviderRegistry};
use identity_core::token::TokenCodec;
use serde_json::{Value, json};
use std::sync::Arc;

fn providers() -> ProviderRegistry {
    ProviderRegistry::new()
        .with(StubProvider::new(
            Provider::Google,
            Some("Ada@Example.com"),
            "Ada Lovelace",
        ))
        .with(StubProvider::new(
            Provider::Github,
            Some("grace@example.com"),
            "Grace Brewster Hopper",
        ))
}

fn server_with(directory: Arc<MemoryDirectory>) -> TestServer {
    let state = build_state(&test_config(), directory, providers());
    TestServer::new(router(state)).expect("create test server")
}

fn token_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-token"),
        HeaderValue::from_str(token).expect("header value"),
    )
}

fn register_body(email: &str) -> Value {
    json!({
        "first_name": "A",
        "last_name": "B",
        "email": email,
        "password": "secret123"
    })
}

// =============================================================================
// Local accounts
// =============================================================================

#[tokio::test]
async fn test_register_login_and_reregister() {
    let server = server_with(Arc::new(MemoryDirectory::new()));

    let response = server
        .post("/auth/register")
        .json(&register_body("a@x.com"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "User a@x.com registered successfully");

    let response = server
        .post("/auth/login")
        .json(&json!({"email": "a@x.com", "password": "secret123"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], true);
    let token = body["token"].as_str().expect("token string");
    let claims = TokenCodec::new(SECRET.as_bytes()).verify(token).unwrap();
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(claims.role, Role::Member);

    let response = server
        .post("/auth/register")
        .json(&register_body("a@x.com"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["status"], false);
    assert_eq!(body["error"], "email_exists");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let server = server_with(Arc::new(MemoryDirectory::new()));
    server
        .post("/auth/register")
        .json(&register_body("a@x.com"))
        .await
        .assert_status_ok();

    let unknown = server
        .post("/auth/login")
        .json(&json!({"email": "nobody@x.com", "password": "secret123"}))
        .await;
    let wrong = server
        .post("/auth/login")
        .json(&json!({"email": "a@x.com", "password": "not-the-password"}))
        .await;

    unknown.assert_status_unauthorized();
    wrong.assert_status_unauthorized();
    assert_eq!(unknown.as_bytes(), wrong.as_bytes());
    let body: Value = wrong.json();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let server = server_with(Arc::new(MemoryDirectory::new()));

    let response = server
        .post("/auth/register")
        .json(&json!({
            "first_name": "A",
            "last_name": "B",
            "email": "not-an-email",
            "password": "secret123"
        }))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "validation_error");

    let response = server
        .post("/auth/register")
        .json(&json!({"email": "a@x.com"}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_role_is_not_caller_settable() {
    let directory = Arc::new(MemoryDirectory::new());
    let server = server_with(directory.clone());

    let mut body = register_body("a@x.com");
    body["role"] = json!("admin");
    server.post("/auth/register").json(&body).await.assert_status_ok();

    let stored = directory.get_by_email("a@x.com").await.unwrap();
    assert_eq!(stored.role, Role::Member);
}

// =============================================================================
// Federated login
// =============================================================================

#[tokio::test]
async fn test_provider_redirect_carries_state() {
    let server = server_with(Arc::new(MemoryDirectory::new()));

    let response = server
        .get("/auth/google")
        .add_query_param("from", "/dashboard")
        .await;
    response.assert_status(StatusCode::FOUND);
    let location = response.header(header::LOCATION);
    assert_eq!(
        location.to_str().unwrap(),
        "https://google.test/authorize?state=/dashboard"
    );

    let response = server.get("/auth/github").await;
    response.assert_status(StatusCode::FOUND);
    assert!(
        response
            .header(header::LOCATION)
            .to_str()
            .unwrap()
            .ends_with("state=/")
    );
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let server = server_with(Arc::new(MemoryDirectory::new()));

    let response = server.get("/auth/gitlab").await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], "unknown_provider");

    server
        .get("/auth/gitlab/callback")
        .add_query_param("code", "abc")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_callback_creates_federated_user() {
    let directory = Arc::new(MemoryDirectory::new());
    let server = server_with(directory.clone());

    let response = server
        .get("/auth/github/callback")
        .add_query_param("code", "abc")
        .add_query_param("state", "/home")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], true);
    assert_eq!(body["from"], "/home");
    assert_eq!(body["message"], "Registered with GitHub successfully");
    assert_eq!(body["data"]["user"]["email"], "grace@example.com");
    assert_eq!(body["data"]["user"]["first_name"], "Grace");
    assert_eq!(body["data"]["user"]["last_name"], "Brewster Hopper");
    assert!(body["data"]["user"].get("password_hash").is_none());

    assert_eq!(directory.len(), 1);
    let stored = directory.get_by_email("grace@example.com").await.unwrap();
    assert_eq!(stored.provider.as_deref(), Some("github"));
    assert!(stored.password_hash.is_none());

    let token = body["token"].as_str().unwrap();
    let claims = TokenCodec::new(SECRET.as_bytes()).verify(token).unwrap();
    assert_eq!(claims.id, stored.id);

    // Second login reuses the record.
    let response = server
        .get("/auth/github/callback")
        .add_query_param("code", "def")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Logged in with GitHub successfully");
    assert_eq!(body["from"], "/");
    assert_eq!(directory.len(), 1);
}

#[tokio::test]
async fn test_callback_provider_mismatch() {
    let directory = Arc::new(MemoryDirectory::new());
    let bound = seed_user(&directory, "ada@example.com", Role::Member, Some("github")).await;
    let server = server_with(directory.clone());

    let response = server
        .get("/auth/google/callback")
        .add_query_param("code", "abc")
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "provider_mismatch");
    assert_eq!(body["provider"], "github");

    assert_eq!(
        directory.get_by_email("ada@example.com").await.unwrap(),
        bound
    );
}

#[tokio::test]
async fn test_callback_failures() {
    let server = server_with(Arc::new(MemoryDirectory::new()));

    let response = server.get("/auth/google/callback").await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "missing_code");

    let response = server
        .get("/auth/google/callback")
        .add_query_param("code", "bad")
        .await;
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"], "upstream_exchange_failed");
    assert!(!body["message"].as_str().unwrap().contains("bad_verification_code"));
}

#[tokio::test]
async fn test_callback_without_email() {
    let registry =
        ProviderRegistry::new().with(StubProvider::new(Provider::Github, None, "No Mail"));
    let directory = Arc::new(MemoryDirectory::new());
    let state = build_state(&test_config(), directory.clone(), registry);
    let server = TestServer::new(router(state)).expect("create test server");

    let response = server
        .get("/auth/github/callback")
        .add_query_param("code", "abc")
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "email_unavailable");
    assert!(directory.is_empty());
}

#[tokio::test]
async fn test_link_policy_denies_local_accounts() {
    let mut config = test_config();
    config.federation.link_local_accounts = false;
    let directory = Arc::new(MemoryDirectory::new());
    let state = build_state(&config, directory.clone(), providers());
    let server = TestServer::new(router(state)).expect("create test server");

    server
        .post("/auth/register")
        .json(&register_body("ada@example.com"))
        .await
        .assert_status_ok();

    let response = server
        .get("/auth/google/callback")
        .add_query_param("code", "abc")
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "local_account_link_denied");
}

// =============================================================================
// Guarded routes
// =============================================================================

#[tokio::test]
async fn test_me_requires_session() {
    let directory = Arc::new(MemoryDirectory::new());
    let user = seed_user(&directory, "ada@example.com", Role::Member, None).await;
    let token = TokenCodec::new(SECRET.as_bytes()).issue(&user).unwrap();
    let server = server_with(directory);

    let response = server.get("/auth/me").await;
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"], "missing_token");

    let response = server
        .get("/auth/me")
        .add_header(token_header("not.a.jwt").0, token_header("not.a.jwt").1)
        .await;
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"], "token_malformed");

    let (name, value) = token_header(&token);
    let response = server.get("/auth/me").add_header(name, value).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["session"]["email"], "ada@example.com");
    assert_eq!(body["session"]["role"], "member");
}

#[tokio::test]
async fn test_token_from_foreign_secret_is_rejected() {
    let directory = Arc::new(MemoryDirectory::new());
    let user = seed_user(&directory, "ada@example.com", Role::Admin, None).await;
    let forged = TokenCodec::new(b"ffffffffffffffffffffffffffffffff")
        .issue(&user)
        .unwrap();
    let server = server_with(directory);

    let (name, value) = token_header(&forged);
    let response = server.get("/auth/me").add_header(name, value).await;
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_signature");
}

#[tokio::test]
async fn test_admin_route_role_gate() {
    let directory = Arc::new(MemoryDirectory::new());
    let admin = seed_user(&directory, "root@example.com", Role::Admin, None).await;
    let member = seed_user(&directory, "ada@example.com", Role::Member, None).await;
    let codec = TokenCodec::new(SECRET.as_bytes());
    let server = server_with(directory);

    server
        .get("/admin/users/ada@example.com")
        .await
        .assert_status_unauthorized();

    let (name, value) = token_header(&codec.issue(&member).unwrap());
    let response = server
        .get("/admin/users/ada@example.com")
        .add_header(name, value)
        .await;
    response.assert_status_forbidden();
    let body: Value = response.json();
    assert_eq!(body["error"], "forbidden");

    let (name, value) = token_header(&codec.issue(&admin).unwrap());
    let response = server
        .get("/admin/users/ADA@example.com")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["id"], member.id);
    assert_eq!(body["data"]["role"], "member");

    let response = server
        .get("/admin/users/nobody@example.com")
        .add_header(name, value)
        .await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn test_health_and_docs() {
    let server = server_with(Arc::new(MemoryDirectory::new()));

    let response = server.get("/healthz").await;
    response.assert_status_ok();
    response.assert_text("ok");

    server.get("/api-docs").await.assert_status_ok();
}
