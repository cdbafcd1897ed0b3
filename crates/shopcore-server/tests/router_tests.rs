//! Router-level tests
//!
//! Drives the feature router with in-memory requests. The database pool is
//! lazily connected and storage points at a dummy endpoint, so requests
//! that are rejected before reaching a store (auth gate, field validation)
//! exercise the same paths they take in production.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use uuid::Uuid;

use shopcore_server::auth::TokenIssuer;
use shopcore_server::config::{AuthConfig, MediaConfig};
use shopcore_server::features::{self, FeatureState};
use shopcore_server::storage::{config::StorageConfig, MediaStorage};

const TEST_SECRET: &str = "router-test-secret";

async fn test_state() -> FeatureState {
    let db = sqlx::PgPool::connect_lazy("postgresql://localhost/shopcore_router_tests")
        .expect("lazy pool");

    let storage = MediaStorage::new(StorageConfig::for_minio(
        "http://localhost:9000",
        "router-test-media",
    ))
    .await
    .expect("storage client");

    let tokens = TokenIssuer::new(&AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        token_ttl_secs: 3600,
    });

    let media = MediaConfig {
        staging_dir: std::env::temp_dir().join("shopcore-router-tests"),
        max_file_bytes: 5 * 1024 * 1024,
    };

    FeatureState {
        db,
        storage,
        tokens,
        media,
    }
}

async fn test_router() -> Router {
    features::router(test_state().await)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn products_require_a_token() {
    let router = test_router().await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/products/all-products")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], serde_json::json!(false));
    assert_eq!(body["error"]["code"], serde_json::json!("UNAUTHORIZED"));
}

#[tokio::test]
async fn products_reject_an_invalid_token() {
    let router = test_router().await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/products/all-products")
                .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn a_valid_token_passes_the_gate() {
    let state = test_state().await;
    let token = state.tokens.sign(Uuid::new_v4()).expect("token");
    let router = features::router(state);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/products/all-products")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    // The gate lets the request through to the handler, which then fails on
    // the unreachable test database rather than on authorization.
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn the_cookie_also_passes_the_gate() {
    let state = test_state().await;
    let token = state.tokens.sign(Uuid::new_v4()).expect("token");
    let router = features::router(state);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/products/all-products")
                .header(header::COOKIE, format!("token={}", token))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_missing_fields() {
    let router = test_router().await;

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"]["message"],
        serde_json::json!("All fields are required")
    );
}

#[tokio::test]
async fn register_rejects_short_passwords() {
    let router = test_router().await;

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"username":"a","email":"a@x.com","password":"short"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_rejects_missing_fields() {
    let router = test_router().await;

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"a@x.com"}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let router = test_router().await;

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/logout")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .expect("ascii cookie");
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("HttpOnly;"));

    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        serde_json::json!("Logged out successfully")
    );
}

#[tokio::test]
async fn create_product_requires_multipart_content() {
    let state = test_state().await;
    let token = state.tokens.sign(Uuid::new_v4()).expect("token");
    let router = features::router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/products/create-product")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .expect("request"),
        )
        .await
        .expect("response");

    // Not multipart/form-data: the extractor rejects before any handler work
    assert!(response.status().is_client_error());
}
