use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use smart_kuku::config::ServerConfig;
use smart_kuku::models::subscriptions::SubscriptionType;
use smart_kuku::server::{build_app, AppState};
use smart_kuku::setup::{create_admin, seed, AdminCredentials};
use smart_kuku::store::{Store, StoreError};

pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub app: Router,
    pub store: Arc<Store>,
}

impl TestApp {
    /// Fresh in-memory store holding only the `admin` account.
    pub async fn new() -> Self {
        let store = Arc::new(Store::in_memory());
        let creds = AdminCredentials {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: ADMIN_PASSWORD.to_string(),
        };
        store
            .write(|t| create_admin(t, &creds, Utc::now()))
            .await
            .unwrap();
        let app = build_app(Arc::new(AppState::new(store.clone(), ServerConfig::default())));
        Self { app, store }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(token), Some(body)).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/v1/token/",
                None,
                Some(json!({"username": username, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    pub async fn register(&self, username: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            "/api/v1/users/",
            None,
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
                "first_name": "Test",
                "last_name": "User",
            })),
        )
        .await
    }

    /// Register `username`, log in and create their farmer profile.
    pub async fn farmer(&self, username: &str) -> String {
        let (status, body) = self.register(username).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let token = self.login(username, PASSWORD).await;
        let (status, body) = self
            .post(
                "/api/v1/farmers/",
                &token,
                json!({"farmerName": username, "email": format!("{}@example.com", username)}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "farmer profile failed: {}", body);
        token
    }

    /// Seed the default plans and resources.
    pub async fn seed_plans(&self) {
        self.store
            .write(|t| Ok::<_, StoreError>(seed::seed_subscriptions(t, Utc::now())))
            .await
            .unwrap();
    }

    pub async fn plan_id(&self, name: &str) -> i64 {
        self.store
            .read(|t| {
                t.subscription_types
                    .find(|p: &SubscriptionType| p.name == name)
                    .map(|p| p.id)
            })
            .await
            .unwrap()
    }

    pub async fn resource_id(&self, name: &str) -> i64 {
        self.store
            .read(|t| t.resources.find(|r| r.name == name).map(|r| r.id))
            .await
            .unwrap()
    }
}
