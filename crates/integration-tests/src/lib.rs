//! Integration tests for Cartify.
//!
//! Each test starts an axum stub of the marketplace API on an ephemeral
//! port and points a [`Cartify`] context at it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartify-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `api_errors` - status mapping, 401 handling, network failures
//! - `api_payloads` - content-type handling and response normalization
//! - `cart_sync` - optimistic cart, reconciliation and logout teardown

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::HeaderMap;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use cartify_client::{Cartify, ClientConfig, MemoryStorage, User};
use cartify_core::{Email, Role, UserId};

/// A stub API server that lives as long as this value.
pub struct StubServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Serve `router` on `127.0.0.1:0`.
    pub async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self { addr, handle }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A context pointed at this server with fresh in-memory storage.
    #[must_use]
    pub fn cartify(&self) -> (Cartify, Arc<MemoryStorage>) {
        context_for(&self.base_url())
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A context for `base_url` with fresh in-memory storage.
#[must_use]
pub fn context_for(base_url: &str) -> (Cartify, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let config = ClientConfig::with_base_url(base_url).unwrap();
    let cartify = Cartify::new(config, storage.clone()).unwrap();
    (cartify, storage)
}

/// An address nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// A buyer account for tests.
#[must_use]
pub fn buyer() -> User {
    User {
        id: UserId::new("u-buyer"),
        email: Email::parse("ada@example.com").unwrap(),
        role: Role::Buyer,
        name: "Ada".to_string(),
    }
}

/// Sign `cartify` in locally without touching the server.
pub fn sign_in(cartify: &Cartify, token: &str) {
    cartify
        .auth()
        .login(buyer(), SecretString::from(token.to_string()));
}

/// Captured request lines (`METHOD path`) and `Authorization` headers.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<Recorded>>>,
}

#[derive(Clone, Debug)]
pub struct Recorded {
    pub line: String,
    pub authorization: Option<String>,
}

impl Recorder {
    pub fn record(&self, line: impl Into<String>, headers: &HeaderMap) {
        let authorization = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.entries.lock().unwrap().push(Recorded {
            line: line.into(),
            authorization,
        });
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.line.clone())
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> Vec<Recorded> {
        self.entries.lock().unwrap().clone()
    }
}
