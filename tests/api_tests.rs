mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestApp;
use tokengate::rate_limit::RateLimitConfig;
use tower::ServiceExt;

const ALICE: &str = "alice@example.com";
const PASSWORD: &str = "correct horse battery staple";
const IP: &str = "10.0.0.1";

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let body = serde_json::json!({ "email": email, "password": password }).to_string();
    app.post_json("/api/auth/login", body, Some(IP)).await
}

async fn refresh(app: &TestApp, token: &str) -> (StatusCode, serde_json::Value) {
    let body = serde_json::json!({ "refresh_token": token }).to_string();
    app.post_json("/api/auth/refresh", body, Some(IP)).await
}

async fn logout(app: &TestApp, token: &str) -> (StatusCode, serde_json::Value) {
    let body = serde_json::json!({ "refresh_token": token }).to_string();
    app.post_json("/api/auth/logout", body, Some(IP)).await
}

async fn verify(app: &TestApp, access_token: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("GET").uri("/api/auth/verify");
    if let Some(token) = access_token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    app.send(builder.body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::new().await;
    let alice = app.create_user(ALICE, PASSWORD).await;

    let (status, json) = login(&app, ALICE, PASSWORD).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["token_type"], "bearer");
    assert_eq!(json["expires_in"], 1800);
    assert_eq!(json["refresh_token"].as_str().unwrap().len(), 43);

    let (status, json) = verify(&app, json["access_token"].as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], alice);

    let attempts = app.db.login_attempts().list_by_email(ALICE).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].attempt.success);
    assert_eq!(attempts[0].attempt.origin, IP);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new().await;
    app.create_user(ALICE, PASSWORD).await;

    let (wrong_status, wrong_json) = login(&app, ALICE, "wrong").await;
    let (unknown_status, unknown_json) = login(&app, "nobody@example.com", PASSWORD).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_json["error"], "Invalid credentials");
    assert_eq!(wrong_json, unknown_json);

    let attempts = app.db.login_attempts().list_by_email(ALICE).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].attempt.success);

    // Unknown identities are audited under the claimed email
    let attempts = app
        .db
        .login_attempts()
        .list_by_email("nobody@example.com")
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
}

#[tokio::test]
async fn test_login_inactive_user() {
    let app = TestApp::new().await;
    let id = app.create_user(ALICE, PASSWORD).await;
    let deactivate = tokengate::db::UserUpdate {
        active: Some(false),
        ..Default::default()
    };
    app.db.users().update(id, &deactivate).await.unwrap();

    let (status, json) = login(&app, ALICE, PASSWORD).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_without_client_ip() {
    let app = TestApp::new().await;
    app.create_user(ALICE, PASSWORD).await;

    let body = serde_json::json!({ "email": ALICE, "password": PASSWORD }).to_string();
    let (status, _) = app.post_json("/api/auth/login", body, None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);

    let attempts = app.db.login_attempts().list_by_email(ALICE).await.unwrap();
    assert!(attempts.is_empty());
}

#[tokio::test]
async fn test_refresh_rotates_token() {
    let app = TestApp::new().await;
    let alice = app.create_user(ALICE, PASSWORD).await;

    let (_, first) = login(&app, ALICE, PASSWORD).await;
    let first_refresh = first["refresh_token"].as_str().unwrap().to_string();

    let (status, second) = refresh(&app, &first_refresh).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(second["refresh_token"], first["refresh_token"]);

    let (status, json) = verify(&app, second["access_token"].as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], alice);

    // The consumed token cannot be replayed
    let (status, json) = refresh(&app, &first_refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid or expired refresh token");

    // The replacement still works
    let (status, _) = refresh(&app, second["refresh_token"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_unknown_token() {
    let app = TestApp::new().await;

    let (status, json) = refresh(&app, "not-a-token").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid or expired refresh token");
}

#[tokio::test]
async fn test_logout_is_not_idempotent() {
    let app = TestApp::new().await;
    app.create_user(ALICE, PASSWORD).await;

    let (_, tokens) = login(&app, ALICE, PASSWORD).await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let (status, _) = logout(&app, refresh_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = logout(&app, refresh_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid refresh token");

    let (status, _) = refresh(&app, refresh_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_rejects_bad_tokens() {
    let app = TestApp::new().await;

    let (status, _) = verify(&app, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = verify(&app, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post_json("/api/auth/login", r#"{"email": "a@x.com"}"#.to_string(), Some(IP))
        .await;

    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rate_limited_per_ip() {
    let app = TestApp::with_rate_limit(|ip_header| {
        RateLimitConfig::with_login_quota(ip_header, 1, 2)
    })
    .await;
    app.create_user(ALICE, PASSWORD).await;

    for _ in 0..2 {
        let (status, _) = login(&app, ALICE, "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = login(&app, ALICE, PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Refresh is not limited
    let (status, _) = refresh(&app, "unknown").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Another client is unaffected
    let body = serde_json::json!({ "email": ALICE, "password": PASSWORD }).to_string();
    let (status, _) = app
        .post_json("/api/auth/login", body, Some("10.0.0.2"))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Rejected requests never reach the audit log
    let attempts = app.db.login_attempts().list_by_email(ALICE).await.unwrap();
    assert_eq!(attempts.len(), 3);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new().await;

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/nothing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
