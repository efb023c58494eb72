//! Authentication & Health Tests
//!
//! Covers admin-gated token issuance, bearer token handling on mutating
//! routes, and the health endpoint.

mod common;

use axum::http::StatusCode;
use common::{app, rfc3339, test_config, TestApp, TEST_ADMIN_TOKEN};
use serde_json::json;
use time::{Duration, OffsetDateTime};

#[tokio::test]
async fn issue_token_with_admin_token() {
    let app = app();

    let resp = app
        .post_admin(
            "/auth/token",
            json!({ "username": "alice" }),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let token = body["access_token"].as_str().unwrap();
    assert!(token.starts_with("v4.local."));
    assert!(body["access_expires_at"].is_string());

    // The issued token identifies the caller on mutating routes.
    let id = app
        .create_announcement(
            token,
            json!({
                "title": "t",
                "message": "m",
                "expiration_date": rfc3339(OffsetDateTime::now_utc() + Duration::days(1)),
            }),
        )
        .await;
    assert_eq!(app.stored(&id).await.unwrap()["created_by"], "alice");
}

#[tokio::test]
async fn issue_token_without_admin_token_is_forbidden() {
    let app = app();

    let resp = app
        .post_admin("/auth/token", json!({ "username": "alice" }), None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "missing admin token");

    let resp = app
        .post_admin("/auth/token", json!({ "username": "alice" }), Some("wrong"))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "invalid admin token");
}

#[tokio::test]
async fn issue_token_disabled_without_configured_admin_token() {
    let mut config = test_config();
    config.admin_token = None;
    let app = TestApp::with_config(config);

    let resp = app
        .post_admin(
            "/auth/token",
            json!({ "username": "alice" }),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "admin token not configured");
}

#[tokio::test]
async fn issue_token_rejects_blank_username() {
    let app = app();

    let resp = app
        .post_admin(
            "/auth/token",
            json!({ "username": "   " }),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "username is required");
}

#[tokio::test]
async fn token_from_another_key_is_rejected() {
    let app = app();
    let mut other_config = test_config();
    other_config.paseto_access_key = *b"fedcba9876543210fedcba9876543210";
    let other = TestApp::with_config(other_config);
    let foreign = other.token_for("mallory");

    let resp = app
        .delete("/announcements/00000000-0000-4000-8000-000000000000", Some(&foreign))
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid token");
}

#[tokio::test]
async fn malformed_authorization_header_is_rejected() {
    let app = app();

    let resp = app
        .request(
            axum::http::Method::DELETE,
            "/announcements/00000000-0000-4000-8000-000000000000",
            None,
            &[("Authorization", "Token abc")],
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid Authorization header");
}

#[tokio::test]
async fn missing_authorization_header_message() {
    let app = app();

    let resp = app
        .delete("/announcements/00000000-0000-4000-8000-000000000000", None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "Not authenticated");
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();

    let resp = app.get("/health", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({ "status": "ok" }));
}
