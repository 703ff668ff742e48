//! Tests for POST /validate - the service-to-service license check.

use axum::{body::Body, http::Request};
use tower::ServiceExt;

mod common;
use common::*;

fn validate_request(key: &str, hwid: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/validate")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "198.51.100.10")
        .body(Body::from(
            serde_json::json!({ "key": key, "hwid": hwid }).to_string(),
        ))
        .unwrap()
}

async fn validate(app: axum::Router, key: &str, hwid: &str) -> bool {
    let response = app.oneshot(validate_request(key, hwid)).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    json["data"]["valid"].as_bool().expect("valid is a boolean")
}

#[tokio::test]
async fn valid_license_validates() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 10, future_timestamp(30), &[]);

    assert!(validate(app(&test), &license.key, "ANY-DEVICE").await);
}

#[tokio::test]
async fn unknown_key_is_invalid() {
    let test = test_app();

    assert!(!validate(app(&test), "KG-DOESNOTEXIST", "DEV-A").await);
}

#[tokio::test]
async fn expired_license_is_invalid_regardless_of_quota_and_device() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 1000, past_timestamp(1), &["DEV-A"]);

    // Plenty of quota, correct device - expiry alone fails it
    assert!(!validate(app(&test), &license.key, "DEV-A").await);
}

#[tokio::test]
async fn bound_license_rejects_unlisted_device() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 10, future_timestamp(30), &["DEV-A", "DEV-B"]);

    assert!(validate(app(&test), &license.key, "DEV-A").await);
    assert!(validate(app(&test), &license.key, "DEV-B").await);
    assert!(!validate(app(&test), &license.key, "DEV-C").await);
}

#[tokio::test]
async fn unbound_license_accepts_any_device_without_binding_it() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 10, future_timestamp(30), &[]);

    assert!(validate(app(&test), &license.key, "FIRST").await);
    assert!(validate(app(&test), &license.key, "SECOND").await);

    // No auto-binding: the hwid set stays empty
    let stored = test.state.licenses.find_by_id(&license.id).unwrap().unwrap();
    assert!(stored.hwids.is_empty());
}

#[tokio::test]
async fn quota_limit_n_admits_n_minus_one_calls() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 3, future_timestamp(30), &[]);

    // Post-increment strict compare: limit 3 admits calls 1 and 2, call 3 fails
    assert!(validate(app(&test), &license.key, "DEV").await);
    assert!(validate(app(&test), &license.key, "DEV").await);
    assert!(!validate(app(&test), &license.key, "DEV").await);
    assert!(!validate(app(&test), &license.key, "DEV").await);
}

#[tokio::test]
async fn quota_counter_has_a_hard_ceiling() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 3, future_timestamp(30), &[]);

    for _ in 0..10 {
        validate(app(&test), &license.key, "DEV").await;
    }

    // The conditional update stops the counter at limit - 1
    let stored = test.state.licenses.find_by_id(&license.id).unwrap().unwrap();
    assert_eq!(stored.request_count, 2);
}

#[tokio::test]
async fn end_to_end_quota_then_device_mismatch() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 3, future_timestamp(1), &["DEV-A"]);

    let results = [
        validate(app(&test), &license.key, "DEV-A").await,
        validate(app(&test), &license.key, "DEV-A").await,
        validate(app(&test), &license.key, "DEV-A").await,
    ];
    assert_eq!(results, [true, true, false]);

    // Device mismatch also fails, independent of the exhausted quota
    assert!(!validate(app(&test), &license.key, "DEV-B").await);
}

#[tokio::test]
async fn successful_validation_records_last_used_ip() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 10, future_timestamp(30), &[]);

    assert!(validate(app(&test), &license.key, "DEV").await);

    let stored = test.state.licenses.find_by_id(&license.id).unwrap().unwrap();
    assert_eq!(stored.last_used_ip.as_deref(), Some("198.51.100.10"));
}

#[tokio::test]
async fn failed_validations_append_failed_attempts() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 10, future_timestamp(30), &["DEV-A"]);

    validate(app(&test), "KG-UNKNOWN", "DEV-A").await;
    validate(app(&test), &license.key, "DEV-X").await;

    let conn = test.state.db.get().unwrap();
    let count = keygate::db::queries::count_failed_attempts(&conn, "198.51.100.10").unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn missing_fields_are_a_validation_error() {
    let test = test_app();

    let response = app(&test)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/validate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"key": "KG-X"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn no_failure_reason_is_disclosed() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 10, past_timestamp(1), &[]);

    let response = app(&test)
        .oneshot(validate_request(&license.key, "DEV"))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["data"]["valid"], false);
    assert!(json["data"].get("reason").is_none());
}
