//! Shared harness for router-level tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront_server::auth::MemoryResetDelivery;
use storefront_server::config::Config;
use storefront_server::rate_limiter::MemoryCounterStore;
use storefront_server::security::MemorySecurityLog;
use storefront_server::store::{MemoryUserStore, UserStore};
use storefront_server::{app, AppState};

pub const PASSWORD: &str = "Str0ng!Pass";

pub fn test_config() -> Config {
    Config {
        bcrypt_cost: 4,
        auth_failure_delay: Duration::from_millis(20),
        ..Config::default()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUserStore>,
    pub log: Arc<MemorySecurityLog>,
    pub delivery: Arc<MemoryResetDelivery>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let log = Arc::new(MemorySecurityLog::new());
        let delivery = Arc::new(MemoryResetDelivery::new());

        let state = AppState::new(
            &config,
            users.clone(),
            Arc::new(MemoryCounterStore::new()),
            log.clone(),
            delivery.clone(),
        )
        .unwrap();

        Self {
            router: app(state, &config),
            users,
            log,
            delivery,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value, client: &str) -> TestResponse {
        self.send(json_request(Method::POST, uri, body, client)).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, username: &str, client: &str) -> TestResponse {
        self.post_json(
            "/api/auth/register",
            json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
                "password_confirm": PASSWORD,
            }),
            client,
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str, client: &str) -> TestResponse {
        self.post_json(
            "/api/auth/login",
            json!({ "username": username, "password": password }),
            client,
        )
        .await
    }

    /// Register and log in, returning the access token
    pub async fn access_token_for(&self, username: &str) -> String {
        let client = format!("setup-{}", username);
        assert_eq!(self.register(username, &client).await.status, StatusCode::CREATED);
        let response = self.login(username, PASSWORD, &client).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["access"].as_str().unwrap().to_string()
    }

    /// Request a reset for `username` and return `(uid, token)` from the
    /// delivered link
    pub async fn reset_link_for(&self, username: &str, client: &str) -> (String, String) {
        let response = self
            .post_json(
                "/api/auth/password-reset",
                json!({ "email": format!("{}@example.com", username) }),
                client,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let sent = self.delivery.sent();
        let (_, path) = sent.last().unwrap();
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        assert_eq!(segments[0], "reset-password");
        (segments[1].to_string(), segments[2].to_string())
    }

    pub async fn confirm_reset(
        &self,
        uid: &str,
        token: &str,
        password: &str,
        client: &str,
    ) -> TestResponse {
        self.post_json(
            "/api/auth/password-reset/confirm",
            json!({
                "uid": uid,
                "token": token,
                "password": password,
                "password_confirm": password,
            }),
            client,
        )
        .await
    }

    pub async fn set_admin(&self, username: &str, is_admin: bool) {
        let user = self.users.find_by_username(username).await.unwrap().unwrap();
        self.users.set_admin(user.id, is_admin).await.unwrap();
    }
}

pub fn json_request(method: Method, uri: &str, body: Value, client: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .unwrap()
}
