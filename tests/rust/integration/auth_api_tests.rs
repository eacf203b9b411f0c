use axum::http::StatusCode;
use serde_json::json;

use super::common::{TestApp, PASSWORD};

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new().await;
    let (status, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "smart-kuku");
}

#[tokio::test]
async fn registered_user_can_log_in() {
    let app = TestApp::new().await;
    let (status, user) = app.register("alice").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["role"], "FARMER");
    assert!(user.get("password_hash").is_none());

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/token/",
            None,
            Some(json!({"username": "alice", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "farmer");
    assert_eq!(body["redirect"], "/dashboard");
    assert!(body["refresh"].is_string());
}

#[tokio::test]
async fn admin_is_sent_to_admin_area() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            "POST",
            "/api/token/",
            None,
            Some(json!({"username": "admin", "password": super::common::ADMIN_PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert_eq!(body["redirect"], "/admin");
    assert_eq!(body["is_superuser"], true);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;
    app.register("alice").await;
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/token/",
            None,
            Some(json!({"username": "alice", "password": "not-the-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn registration_validates_fields() {
    let app = TestApp::new().await;
    app.register("alice").await;
    let (status, body) = app.register("alice").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["username"][0], "A user with that username already exists.");

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/users/",
            None,
            Some(json!({
                "username": "bob",
                "email": "bob@example.com",
                "password": "short",
                "first_name": "Bob",
                "last_name": "B",
                "role": "OWNER",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["password"].is_array());
    assert_eq!(
        body["role"][0],
        "Invalid role. Must be one of: ADMIN, FARMER, ACCOUNTANT, EXPERT"
    );
}

#[tokio::test]
async fn refresh_issues_new_access_token() {
    let app = TestApp::new().await;
    app.register("alice").await;
    let (_, pair) = app
        .request(
            "POST",
            "/api/v1/token/",
            None,
            Some(json!({"username": "alice", "password": PASSWORD})),
        )
        .await;

    let (status, body) = app
        .request(
            "POST",
            "/api/token/refresh/",
            None,
            Some(json!({"refresh": pair["refresh"]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap();
    let (status, me) = app.get("/api/v1/users/me/", access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/token/refresh/",
            None,
            Some(json!({"refresh": pair["access"]})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_and_bad_tokens() {
    let app = TestApp::new().await;
    let (status, body) = app.request("GET", "/api/v1/users/me/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Authentication credentials were not provided.");

    let (status, _) = app.get("/api/v1/users/me/", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_admin_requires_administrator() {
    let app = TestApp::new().await;
    app.register("alice").await;
    let token = app.login("alice", PASSWORD).await;

    let (status, body) = app.get("/api/v1/users/", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "You do not have permission to perform this action.");

    let admin = app.admin_token().await;
    let (status, users) = app.get("/api/v1/users/", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = TestApp::new().await;
    let (status, body) = app.request("GET", "/api/v1/nothing-here/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not found.");
}
