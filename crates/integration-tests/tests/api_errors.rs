//! Status mapping, session rejection and transport failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use rust_decimal::Decimal;
use serde_json::json;

use cartify_client::storage::keys;
use cartify_client::{ApiError, CartItem, Cartify, ClientConfig, MemoryStorage, Method, Storage};
use cartify_core::ProductId;
use cartify_integration_tests::{Recorder, StubServer, closed_port_url, context_for, sign_in};

// =============================================================================
// 401
// =============================================================================

fn unauthorized_router() -> Router {
    Router::new().route(
        "/api/buyer/orders",
        get(|| async {
            (
                StatusCode::UNAUTHORIZED,
                axum::Json(json!({"message": "Token expired"})),
            )
        }),
    )
}

#[tokio::test]
async fn test_unauthorized_clears_session_and_fires_hook() {
    let server = StubServer::start(unauthorized_router()).await;
    let (cartify, storage) = server.cartify();
    sign_in(&cartify, "stale-token");
    cartify
        .cart()
        .add_to_cart(CartItem::new(1_u64, "A", Decimal::from(10)));

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    cartify.api().set_unauthorized_hook(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let err = cartify.api().buyer().orders().await.unwrap_err();

    assert!(
        matches!(&err, ApiError::AuthenticationRequired { login_path } if login_path == "/login"),
        "got {err:?}"
    );
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!cartify.auth().is_authenticated());
    assert!(storage.get(keys::TOKEN).is_none());
    assert!(storage.get(keys::USER).is_none());
    // Only credentials are dropped; the cart survives a 401.
    assert_eq!(cartify.cart().cart_items_count(), 1);
}

#[tokio::test]
async fn test_unauthorized_without_hook_still_errors() {
    let server = StubServer::start(unauthorized_router()).await;
    let (cartify, _storage) = server.cartify();
    sign_in(&cartify, "stale-token");

    let err = cartify.api().buyer().orders().await.unwrap_err();

    assert!(err.is_auth_required());
    assert!(cartify.auth().token().is_none());
}

// =============================================================================
// Status mapping
// =============================================================================

fn status_router() -> Router {
    Router::new()
        .route(
            "/api/buyer/products/{id}",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    axum::Json(json!({"success": false, "message": "Product not found"})),
                )
            }),
        )
        .route("/api/buyer/orders/{id}", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/api/buyer/wallet",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({"error": "database unavailable"})),
                )
            }),
        )
        .route(
            "/api/buyer/dashboard",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "upstream down") }),
        )
        .route(
            "/api/buyer/cart",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    axum::Json(json!({"message": "Out of stock"})),
                )
            }),
        )
}

#[tokio::test]
async fn test_not_found_uses_server_message() {
    let server = StubServer::start(status_router()).await;
    let (cartify, _storage) = server.cartify();

    let err = cartify
        .api()
        .buyer()
        .product(&ProductId::new("missing"))
        .await
        .unwrap_err();

    assert!(matches!(&err, ApiError::NotFound(m) if m == "Product not found"), "got {err:?}");
    assert_eq!(err.to_string(), "Not found: Product not found");
}

#[tokio::test]
async fn test_not_found_without_body() {
    let server = StubServer::start(status_router()).await;
    let (cartify, _storage) = server.cartify();

    let err = cartify
        .api()
        .buyer()
        .order(&"o1".into())
        .await
        .unwrap_err();

    assert!(matches!(&err, ApiError::NotFound(m) if m == "Resource not found"), "got {err:?}");
}

#[tokio::test]
async fn test_server_errors() {
    let server = StubServer::start(status_router()).await;
    let (cartify, _storage) = server.cartify();

    let err = cartify.api().buyer().wallet().await.unwrap_err();
    assert!(
        matches!(&err, ApiError::Server { status: 500, message } if message == "database unavailable"),
        "got {err:?}"
    );

    let err = cartify.api().buyer().dashboard().await.unwrap_err();
    assert!(
        matches!(&err, ApiError::Server { status: 503, message } if message == "upstream down"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_other_statuses() {
    let server = StubServer::start(status_router()).await;
    let (cartify, _storage) = server.cartify();

    let err = cartify
        .api()
        .buyer()
        .add_to_cart(&"p1".into(), 1)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, ApiError::Status { status: 422, message } if message == "Out of stock"),
        "got {err:?}"
    );
}

// =============================================================================
// Transport
// =============================================================================

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let (cartify, _storage) = context_for(&closed_port_url().await);

    let err = cartify
        .api()
        .request(Method::GET, "/api/buyer/products", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
    assert!(err.is_network());
    assert!(err.to_string().starts_with("Network error"));
}

fn slow_router(recorder: &Recorder) -> Router {
    let on_get = recorder.clone();
    let on_post = recorder.clone();
    Router::new().route(
        "/api/slow",
        get(move |headers: HeaderMap| async move {
            on_get.record("GET /api/slow", &headers);
            tokio::time::sleep(Duration::from_secs(2)).await;
            "late"
        })
        .post(move |headers: HeaderMap| async move {
            on_post.record("POST /api/slow", &headers);
            tokio::time::sleep(Duration::from_secs(2)).await;
            "late"
        }),
    )
}

fn impatient(base_url: &str) -> Cartify {
    let mut config = ClientConfig::with_base_url(base_url).unwrap();
    config.request_timeout = Duration::from_millis(200);
    Cartify::new(config, Arc::new(MemoryStorage::new())).unwrap()
}

#[tokio::test]
async fn test_timed_out_get_is_retried_once() {
    let recorder = Recorder::default();
    let server = StubServer::start(slow_router(&recorder)).await;
    let cartify = impatient(&server.base_url());

    let err = cartify
        .api()
        .request(Method::GET, "/api/slow", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Timeout), "got {err:?}");
    assert_eq!(recorder.lines(), vec!["GET /api/slow", "GET /api/slow"]);
}

#[tokio::test]
async fn test_timed_out_post_is_not_retried() {
    let recorder = Recorder::default();
    let server = StubServer::start(slow_router(&recorder)).await;
    let cartify = impatient(&server.base_url());

    let err = cartify
        .api()
        .request(Method::POST, "/api/slow", Some(json!({"x": 1})))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Timeout), "got {err:?}");
    assert_eq!(recorder.lines(), vec!["POST /api/slow"]);
}

// =============================================================================
// Headers & health
// =============================================================================

#[tokio::test]
async fn test_bearer_token_and_request_id_headers() {
    let recorder = Recorder::default();
    let seen_ids = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
    let rec = recorder.clone();
    let ids = Arc::clone(&seen_ids);
    let router = Router::new().route(
        "/api/auth/me",
        get(move |headers: HeaderMap| async move {
            rec.record("GET /api/auth/me", &headers);
            if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
                ids.lock().unwrap().push(id.to_string());
            }
            axum::Json(json!({"user": {"_id": "u-buyer", "email": "ada@example.com", "role": "buyer"}}))
                .into_response()
        }),
    );
    let server = StubServer::start(router).await;
    let (cartify, _storage) = server.cartify();

    cartify.api().auth().me().await.unwrap();
    sign_in(&cartify, "secret-jwt");
    cartify.api().auth().me().await.unwrap();

    let calls = recorder.all();
    assert_eq!(calls[0].authorization, None);
    assert_eq!(calls[1].authorization.as_deref(), Some("Bearer secret-jwt"));

    let ids = seen_ids.lock().unwrap();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_health() {
    let router = Router::new().route(
        "/api/health",
        get(|| async { axum::Json(json!({"status": "ok"})) }),
    );
    let server = StubServer::start(router).await;
    let (cartify, _storage) = server.cartify();

    let health = cartify.api().health().await;
    assert!(health.healthy);
    assert_eq!(health.status.as_deref(), Some("ok"));

    let (offline, _storage) = context_for(&closed_port_url().await);
    let health = offline.api().health().await;
    assert!(!health.healthy);
    assert_eq!(health.status, None);
}
