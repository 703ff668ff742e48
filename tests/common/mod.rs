//! Shared test fixtures: a temp-file database, app state wired the way
//! main() wires it, and small helpers for seeding and requests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use chrono::Utc;
use serde_json::Value;

use keygate::blocklist::BlocklistService;
use keygate::config::RateLimitSettings;
use keygate::db::{create_pool, init_db, AppState};
use keygate::handlers;
use keygate::jwt::{generate_keypair, TokenSigner, TokenVerifier};
use keygate::licenses::LicenseService;
use keygate::models::{CreateLicense, CreateUser, License, Role, User};
use keygate::rate_limit::RateLimiters;

pub const TEST_SERVICE_SECRET: &str = "test-service-secret";
pub const TEST_SECRET_HEADER: &str = "x-service-secret";
pub const DEFAULT_REQUEST_LIMIT: i64 = 1000;

pub struct TestApp {
    pub state: AppState,
    pub signer: TokenSigner,
    // Keeps the backing database file alive for the test's duration
    _db: tempfile::NamedTempFile,
}

pub fn test_app() -> TestApp {
    let db_file = tempfile::NamedTempFile::new().expect("Failed to create temp database");
    let path = db_file.path().to_str().expect("temp path is valid utf-8");

    let pool = create_pool(path).expect("Failed to create pool");
    {
        let conn = pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize schema");
    }

    let (private_key, public_key) = generate_keypair();
    let signer = TokenSigner::from_base64(&private_key).expect("Failed to build signer");
    let dev_signer = TokenSigner::from_base64(&private_key).expect("Failed to build signer");

    let state = AppState {
        db: pool.clone(),
        licenses: LicenseService::new(pool.clone(), DEFAULT_REQUEST_LIMIT),
        blocklist: BlocklistService::new(pool),
        verifier: TokenVerifier::new(Some(public_key)),
        service_secret: Some(TEST_SERVICE_SECRET.to_string()),
        service_secret_header: TEST_SECRET_HEADER.to_string(),
        dev_signer: Some(Arc::new(dev_signer)),
        dev_mode: true,
    };

    TestApp {
        state,
        signer,
        _db: db_file,
    }
}

/// Limiter budgets high enough that ordinary tests never trip them.
pub fn generous_limits() -> RateLimitSettings {
    RateLimitSettings {
        relaxed_rpm: 10_000,
        standard_rpm: 10_000,
        strict_rpm: 10_000,
    }
}

pub fn app_with_limits(test: &TestApp, settings: RateLimitSettings) -> Router {
    let limiters = RateLimiters::from_settings(&settings);
    handlers::router(test.state.clone(), &limiters).with_state(test.state.clone())
}

pub fn app(test: &TestApp) -> Router {
    app_with_limits(test, generous_limits())
}

/// Router with the dev endpoints mounted, the way main() mounts them in
/// dev mode.
pub fn dev_app(test: &TestApp) -> Router {
    let limiters = RateLimiters::from_settings(&generous_limits());
    handlers::router(test.state.clone(), &limiters)
        .route("/dev/token", post(handlers::dev::create_dev_token))
        .route("/dev/licenses", post(handlers::dev::create_dev_license))
        .with_state(test.state.clone())
}

// ============ Seeding ============

pub fn create_test_user(test: &TestApp, username: &str, role: Role) -> User {
    let conn = test.state.db.get().unwrap();
    keygate::db::queries::create_user(
        &conn,
        &CreateUser {
            username: username.to_string(),
            role,
        },
    )
    .expect("Failed to create test user")
}

pub fn create_test_license(
    test: &TestApp,
    admin_id: &str,
    request_limit: i64,
    valid_until: i64,
    hwids: &[&str],
) -> License {
    test.state
        .licenses
        .create(
            admin_id,
            &CreateLicense {
                license_type: "standard".to_string(),
                user_id: None,
                valid_until: Some(valid_until),
                request_limit: Some(request_limit),
                hwids: hwids.iter().map(|s| s.to_string()).collect(),
            },
        )
        .expect("Failed to create test license")
}

pub fn token_for(test: &TestApp, user: &User) -> String {
    test.signer
        .sign(&user.id, user.role, 3600)
        .expect("Failed to sign test token")
}

pub fn future_timestamp(days: i64) -> i64 {
    Utc::now().timestamp() + days * 86400
}

pub fn past_timestamp(days: i64) -> i64 {
    Utc::now().timestamp() - days * 86400
}

// ============ Responses ============

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Response should be valid JSON")
}
