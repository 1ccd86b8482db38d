//! Request Pipeline Tests
//!
//! Drives the full router: request screening, incident recording and
//! the security headers on allowed and blocked responses.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{json_request, test_config, TestApp};
use storefront_server::config::{Config, Environment};
use storefront_server::middleware::{CONTENT_SECURITY_POLICY, STRICT_TRANSPORT_SECURITY};

fn assert_security_headers(headers: &axum::http::HeaderMap) {
    assert_eq!(headers[header::CONTENT_SECURITY_POLICY], CONTENT_SECURITY_POLICY);
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::X_XSS_PROTECTION], "1; mode=block");
}

// ============================================================================
// Screening
// ============================================================================

#[tokio::test]
async fn test_sql_injection_in_query_is_blocked() {
    let app = TestApp::new();

    let response = app
        .get("/api/users/me?search=1%20UNION%20SELECT%20password", None)
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body,
        json!({ "detail": "Potential SQL injection detected" })
    );

    let incidents = app.log.incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].reason, "SQL Injection attempt detected");
    assert_eq!(incidents[0].path, "/api/users/me");
    assert_eq!(incidents[0].method, "GET");
    assert_eq!(incidents[0].user, "Anonymous");
}

#[tokio::test]
async fn test_xss_in_json_body_is_blocked_before_the_handler() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/api/auth/register",
            json!({
                "username": "<script>alert(1)</script>",
                "email": "x@example.com",
                "password": "Str0ng!Pass",
            }),
            "10.0.0.1",
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body, json!({ "detail": "Potential XSS attack detected" }));
    assert_eq!(app.log.incidents()[0].reason, "XSS attack attempt detected");
    assert_eq!(app.log.incidents()[0].client_addr, "10.0.0.1");

    // Never reached registration, so nothing was created or counted
    for i in 0..3 {
        let ok = app.register(&format!("user{}", i), "10.0.0.1").await;
        assert_eq!(ok.status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn test_sql_comment_in_form_field_is_blocked() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=admin%27--&password=x"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body,
        json!({ "detail": "Potential SQL injection detected" })
    );
}

#[tokio::test]
async fn test_statement_terminator_with_trailing_newline_is_blocked() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": \"a;b\", \"password\": \"x\"}\n"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.log.incidents().len(), 1);
}

#[tokio::test]
async fn test_clean_request_passes() {
    let app = TestApp::new();

    let response = app.get("/health?page=2&sort=name", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert!(app.log.incidents().is_empty());
}

#[tokio::test]
async fn test_one_incident_per_blocked_request() {
    let app = TestApp::new();

    // Both categories present; SQL is checked first and only one record is kept
    let response = app
        .get(
            "/health?a=DROP%20TABLE%20users&b=%3Ciframe%20src%3Dx%3E&c=javascript:alert(1)",
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    let incidents = app.log.incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].reason, "SQL Injection attempt detected");
}

#[tokio::test]
async fn test_incident_names_the_authenticated_user() {
    let app = TestApp::new();
    let token = app.access_token_for("alice").await;

    let response = app
        .get("/api/users/me?q=%3Cimg%20src%3Dx%20onerror%3Dalert(1)%3E", Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.log.incidents()[0].user, "alice");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = TestApp::with_config(Config {
        max_body_bytes: 64,
        ..test_config()
    });

    let response = app
        .post_json(
            "/api/auth/login",
            json!({ "username": "a".repeat(100), "password": "x" }),
            "10.0.0.1",
        )
        .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_security_headers(&response.headers);
}

#[tokio::test]
async fn test_static_files_are_served_and_screened() {
    let root = std::env::temp_dir().join(format!("storefront-static-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("app.css"), "body { margin: 0 }").unwrap();

    let app = TestApp::with_config(Config {
        static_root: root.to_string_lossy().into_owned(),
        ..test_config()
    });

    let served = app
        .send(
            Request::builder()
                .uri("/static/app.css")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(served.status, StatusCode::OK);
    assert_security_headers(&served.headers);

    let blocked = app.get("/static/app.css?v=%3Cscript%3E", None).await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);

    std::fs::remove_dir_all(&root).ok();
}

// ============================================================================
// Security headers
// ============================================================================

#[tokio::test]
async fn test_headers_on_success_and_blocked_responses() {
    let app = TestApp::new();

    let ok = app.get("/health", None).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_security_headers(&ok.headers);
    assert!(!ok.headers.contains_key(header::STRICT_TRANSPORT_SECURITY));

    let blocked = app.get("/health?q=%3Cscript%3E", None).await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);
    assert_security_headers(&blocked.headers);
}

#[tokio::test]
async fn test_headers_on_error_responses() {
    let app = TestApp::new();

    let unauthenticated = app.get("/api/users/me", None).await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);
    assert_security_headers(&unauthenticated.headers);

    let missing = app.get("/no-such-page", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_security_headers(&missing.headers);
}

#[tokio::test]
async fn test_hsts_only_in_production() {
    let app = TestApp::with_config(Config {
        environment: Environment::Production,
        ..test_config()
    });

    let ok = app.get("/health", None).await;
    assert_eq!(
        ok.headers[header::STRICT_TRANSPORT_SECURITY],
        STRICT_TRANSPORT_SECURITY
    );

    let blocked = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            json!({ "username": "x' OR 1=1; --", "password": "x" }),
            "10.0.0.1",
        ))
        .await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);
    assert_eq!(
        blocked.headers[header::STRICT_TRANSPORT_SECURITY],
        STRICT_TRANSPORT_SECURITY
    );
}
