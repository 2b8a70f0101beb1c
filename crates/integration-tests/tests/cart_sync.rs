//! Session, optimistic cart synchronization and logout teardown.

use std::sync::{Arc, Mutex};

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use cartify_client::storage::keys;
use cartify_client::{CartItem, ClientError, DeliveryState, ReconcilePolicy, Storage};
use cartify_core::{ConversationId, ProductId};
use cartify_integration_tests::{Recorder, StubServer, sign_in};

// =============================================================================
// Login & logout
// =============================================================================

#[tokio::test]
async fn test_login_stores_session() {
    let router = Router::new().route(
        "/api/auth/login",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["email"], "ada@example.com");
            Json(json!({
                "success": true,
                "token": "fresh-jwt",
                "user": {"_id": "u1", "email": "ada@example.com", "role": "seller", "name": "Ada"}
            }))
        }),
    );
    let server = StubServer::start(router).await;
    let (cartify, storage) = server.cartify();

    let user = cartify
        .login(" Ada@Example.com ", &SecretString::from("secret1".to_string()))
        .await
        .unwrap();

    assert_eq!(user.name, "Ada");
    assert!(cartify.auth().is_authenticated());
    assert!(cartify.auth().is_seller());
    assert_eq!(
        cartify.auth().token().unwrap().expose_secret(),
        "fresh-jwt"
    );
    assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("fresh-jwt"));
}

#[tokio::test]
async fn test_login_rejects_malformed_email_locally() {
    let server = StubServer::start(Router::new()).await;
    let (cartify, _storage) = server.cartify();

    let err = cartify
        .login("not-an-email", &SecretString::from("secret1".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_logout_tears_down_session() {
    let server = StubServer::start(Router::new()).await;
    let (cartify, storage) = server.cartify();
    sign_in(&cartify, "jwt");
    cartify
        .cart()
        .add_to_cart(CartItem::new(1_u64, "A", Decimal::from(10)));
    storage.set(keys::USER_PREFERENCES, r#"{"theme":"dark"}"#).unwrap();
    storage.set(keys::THEME, r#""dark""#).unwrap();

    cartify.logout().await;

    assert!(!cartify.auth().is_authenticated());
    assert!(cartify.cart().is_empty());
    for key in [keys::TOKEN, keys::USER, keys::CART, keys::USER_PREFERENCES] {
        assert!(storage.get(key).is_none(), "{key} should be cleared");
    }
    assert_eq!(storage.get(keys::THEME).as_deref(), Some(r#""dark""#));
}

// =============================================================================
// Optimistic cart
// =============================================================================

fn cart_router(recorder: &Recorder, server_lines: Value, fail_writes: bool) -> Router {
    let on_get = recorder.clone();
    let on_add = recorder.clone();
    let on_update = recorder.clone();
    let on_remove = recorder.clone();
    let on_clear = recorder.clone();
    let write_status = if fail_writes {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    Router::new()
        .route(
            "/api/buyer/cart",
            get(move |headers: HeaderMap| {
                let lines = server_lines.clone();
                async move {
                    on_get.record("GET /api/buyer/cart", &headers);
                    Json(json!({"data": {"cart": {"items": lines}}}))
                }
            })
            .post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                on_add.record(
                    format!("POST {} x{}", body["productId"].as_str().unwrap_or("?"), body["quantity"]),
                    &headers,
                );
                (write_status, Json(json!({"success": !fail_writes})))
            })
            .delete(move |headers: HeaderMap| async move {
                on_clear.record("DELETE cart", &headers);
                (write_status, Json(json!({"success": !fail_writes})))
            }),
        )
        .route(
            "/api/buyer/cart/{id}",
            put(
                move |Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    on_update.record(format!("PUT {id} x{}", body["quantity"]), &headers);
                    (write_status, Json(json!({"success": !fail_writes})))
                },
            )
            .delete(move |Path(id): Path<String>, headers: HeaderMap| async move {
                on_remove.record(format!("DELETE {id}"), &headers);
                (write_status, Json(json!({"success": !fail_writes})))
            }),
        )
}

#[tokio::test]
async fn test_guest_cart_never_calls_server() {
    let recorder = Recorder::default();
    let server = StubServer::start(cart_router(&recorder, json!([]), false)).await;
    let (cartify, _storage) = server.cartify();

    cartify
        .add_to_cart(CartItem::new("p1", "A", Decimal::from(10)))
        .await
        .unwrap();

    assert_eq!(cartify.cart().cart_items_count(), 1);
    assert!(recorder.lines().is_empty());
}

#[tokio::test]
async fn test_signed_in_cart_changes_are_mirrored() {
    let recorder = Recorder::default();
    let server = StubServer::start(cart_router(&recorder, json!([]), false)).await;
    let (cartify, _storage) = server.cartify();
    sign_in(&cartify, "jwt");

    let p1 = ProductId::new("p1");
    cartify
        .add_to_cart(CartItem::new("p1", "A", Decimal::from(10)).with_quantity(2))
        .await
        .unwrap();
    cartify.update_quantity(&p1, 5).await.unwrap();
    cartify.update_quantity(&p1, 0).await.unwrap();
    cartify.remove_from_cart(&p1).await.unwrap();
    cartify.clear_cart().await.unwrap();

    assert_eq!(
        recorder.lines(),
        vec!["POST p1 x2", "PUT p1 x5", "DELETE p1", "DELETE cart"]
    );
    let auth = recorder.all();
    assert!(auth.iter().all(|r| r.authorization.as_deref() == Some("Bearer jwt")));
}

#[tokio::test]
async fn test_failed_sync_keeps_local_change() {
    let recorder = Recorder::default();
    let server = StubServer::start(cart_router(&recorder, json!([]), true)).await;
    let (cartify, _storage) = server.cartify();
    sign_in(&cartify, "jwt");

    let err = cartify
        .add_to_cart(CartItem::new("p1", "A", Decimal::from(10)))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api(_)), "got {err:?}");
    assert!(cartify.cart().contains(&ProductId::new("p1")));
    assert_eq!(cartify.cart().cart_total(), Decimal::from(10));
}

// =============================================================================
// Reconciliation
// =============================================================================

fn server_lines() -> Value {
    json!([
        {"product": {"_id": "p2", "name": "B", "price": 5}, "quantity": 3},
        {"productId": "p3", "name": "C", "price": 2, "quantity": 1}
    ])
}

#[tokio::test]
async fn test_pull_cart_server_wins() {
    let recorder = Recorder::default();
    let server = StubServer::start(cart_router(&recorder, server_lines(), false)).await;
    let (cartify, storage) = server.cartify();
    sign_in(&cartify, "jwt");
    cartify
        .cart()
        .add_to_cart(CartItem::new("p1", "A", Decimal::from(10)));

    let items = cartify.pull_cart(ReconcilePolicy::ServerWins).await.unwrap();

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p3"]);
    assert_eq!(cartify.cart().cart_total(), Decimal::from(17));
    assert_eq!(cartify.cart().cart_items_count(), 4);
    assert!(storage.get(keys::CART).unwrap().contains("p2"));
    assert_eq!(recorder.lines(), vec!["GET /api/buyer/cart"]);
}

#[tokio::test]
async fn test_pull_cart_keep_local_pushes_differences() {
    let recorder = Recorder::default();
    let server = StubServer::start(cart_router(&recorder, server_lines(), false)).await;
    let (cartify, _storage) = server.cartify();
    sign_in(&cartify, "jwt");
    let cart = cartify.cart();
    cart.add_to_cart(CartItem::new("p1", "A", Decimal::from(10)));
    cart.add_to_cart(CartItem::new("p3", "C", Decimal::from(2)).with_quantity(4));

    let items = cartify.pull_cart(ReconcilePolicy::KeepLocal).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(
        recorder.lines(),
        vec!["GET /api/buyer/cart", "POST p1 x1", "PUT p3 x4", "DELETE p2"]
    );
}

#[tokio::test]
async fn test_pull_cart_keep_local_stops_at_first_failure() {
    let recorder = Recorder::default();
    let on_get = recorder.clone();
    let on_update = recorder.clone();
    let router = Router::new()
        .route(
            "/api/buyer/cart",
            get(move |headers: HeaderMap| async move {
                on_get.record("GET /api/buyer/cart", &headers);
                Json(json!({"cart": {"items": [
                    {"productId": "p1", "name": "A", "price": 10, "quantity": 1},
                    {"productId": "p2", "name": "B", "price": 5, "quantity": 1},
                    {"productId": "p9", "name": "Z", "price": 1, "quantity": 1}
                ]}}))
            }),
        )
        .route(
            "/api/buyer/cart/{id}",
            put(
                move |Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    on_update.record(format!("PUT {id} x{}", body["quantity"]), &headers);
                    if id == "p2" {
                        StatusCode::INTERNAL_SERVER_ERROR
                    } else {
                        StatusCode::OK
                    }
                },
            ),
        );
    let server = StubServer::start(router).await;
    let (cartify, _storage) = server.cartify();
    sign_in(&cartify, "jwt");
    let cart = cartify.cart();
    cart.add_to_cart(CartItem::new("p1", "A", Decimal::from(10)).with_quantity(3));
    cart.add_to_cart(CartItem::new("p2", "B", Decimal::from(5)).with_quantity(4));
    let before = cart.items();

    let err = cartify
        .pull_cart(ReconcilePolicy::KeepLocal)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api(_)), "got {err:?}");
    assert_eq!(cartify.cart().items(), before);
    assert_eq!(
        recorder.lines(),
        vec!["GET /api/buyer/cart", "PUT p1 x3", "PUT p2 x4"]
    );
}

// =============================================================================
// Optimistic messages
// =============================================================================

#[tokio::test]
async fn test_send_message_reports_pending_then_sent() {
    let router = Router::new().route(
        "/api/user/conversations/{id}/messages",
        post(|Path(id): Path<String>, Json(body): Json<Value>| async move {
            Json(json!({"message": {
                "_id": format!("m-{id}"),
                "sender": {"_id": "u-buyer", "name": "Ada"},
                "text": body["text"],
                "createdAt": "2026-05-01T09:30:00Z"
            }}))
        }),
    );
    let server = StubServer::start(router).await;
    let (cartify, _storage) = server.cartify();
    sign_in(&cartify, "jwt");

    let seen = Arc::new(Mutex::new(None));
    let seen_in_callback = Arc::clone(&seen);
    let sent = cartify
        .send_message(&ConversationId::new("c1"), " Is this in stock? ", move |pending| {
            *seen_in_callback.lock().unwrap() = Some(pending.state.clone());
        })
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), Some(DeliveryState::Pending));
    assert_eq!(sent.text, "Is this in stock?");
    assert_eq!(sent.state, DeliveryState::Sent("m-c1".into()));
}

#[tokio::test]
async fn test_send_message_failure_is_reported_not_raised() {
    let router = Router::new().route(
        "/api/user/conversations/{id}/messages",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let server = StubServer::start(router).await;
    let (cartify, _storage) = server.cartify();
    sign_in(&cartify, "jwt");

    let sent = cartify
        .send_message(&ConversationId::new("c1"), "hello", |_| {})
        .await
        .unwrap();

    assert!(matches!(sent.state, DeliveryState::Failed(_)), "got {:?}", sent.state);
}
