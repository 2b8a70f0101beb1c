//! Marketplace REST API client.
//!
//! # Architecture
//!
//! - One [`ApiClient`] per [`crate::Cartify`] context; every HTTP call goes
//!   through [`ApiClient::request`]
//! - The bearer token is read from the shared [`AuthStore`] on every request
//! - A 401 clears the session and fires the unauthorized hook
//! - Responses are normalized once at this boundary (see `conversions`)
//! - Product reads are cached via `moka` (5 minute TTL)
//!
//! # Request policy
//!
//! Every request has a timeout. A request that never reached the server
//! (connection refused, DNS failure) is retried once; a timed-out `GET` is
//! also retried once. Nothing else is retried.
//!
//! # Endpoint groups
//!
//! ```rust,ignore
//! let products = client.buyer().products(&ProductQuery::default()).await?;
//! client.seller().request_payout(request).await?;
//! client.admin().approve_payout(&payout_id).await?;
//! ```

mod admin;
mod auth;
mod buyer;
mod cache;
mod conversions;
mod seller;
pub mod types;
mod user;

use std::borrow::Cow;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use url::Url;

use cartify_core::ValidationError;

use crate::config::ClientConfig;
use crate::session::AuthStore;

pub use admin::AdminApi;
pub use auth::AuthApi;
pub use buyer::BuyerApi;
pub use reqwest::Method;
pub use seller::SellerApi;
pub use user::UserApi;

use cache::{CacheKey, CacheValue};

/// Timeout for the health probe, independent of the configured request timeout.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum characters of a response body quoted in an error.
const ERROR_BODY_LIMIT: usize = 200;

/// Callback fired when the server rejects the session.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Errors that can occur when calling the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the session (HTTP 401). The session has been cleared.
    #[error("Authentication required - please sign in again")]
    AuthenticationRequired {
        /// Route the user should be sent to.
        login_path: String,
    },

    /// HTTP 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 5xx.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status.
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("Network error - please check your connection")]
    Network(#[source] reqwest::Error),

    /// The request exceeded its timeout.
    #[error("Request timed out")]
    Timeout,

    /// A successful response did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// A JSON response body was not valid JSON.
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A record id cannot be used as a path segment.
    #[error("Invalid id: {0:?}")]
    InvalidId(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[source] reqwest::Error),

    /// Input was rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ApiError {
    /// Whether the caller should send the user back to sign in.
    #[must_use]
    pub const fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthenticationRequired { .. })
    }

    /// Whether the failure happened before the server answered.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `application/json` (or `+json`) body.
    Json(Value),
    /// Any other non-empty body.
    Text(String),
    /// Empty body.
    Empty,
}

impl Payload {
    /// Interpret the payload as JSON; an empty body becomes `null`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Malformed` for a text body.
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Empty => Ok(Value::Null),
            Self::Text(text) => Err(ApiError::Malformed(format!(
                "expected JSON, got text: {}",
                truncate(&text)
            ))),
        }
    }
}

/// Result of the health probe.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// The server answered with a success status.
    pub healthy: bool,
    /// Round-trip time.
    pub latency: Duration,
    /// The server's reported status string, if any.
    pub status: Option<String>,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the marketplace REST API.
///
/// Cheaply cloneable; clones share the session, hook and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
    retry_network_errors: bool,
    login_path: String,
    auth: Arc<AuthStore>,
    on_unauthorized: RwLock<Option<UnauthorizedHook>>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("request_timeout", &self.inner.request_timeout)
            .field("retry_network_errors", &self.inner.retry_network_errors)
            .finish_non_exhaustive()
    }
}

/// A fully resolved request, kept so it can be re-sent.
struct RequestSpec {
    method: Method,
    url: Url,
    body: Option<Value>,
    timeout: Duration,
    retry: bool,
}

impl ApiClient {
    /// Create a client that authenticates with the session in `auth`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, auth: Arc<AuthStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cartify-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Http)?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_base_url.clone(),
                request_timeout: config.request_timeout,
                retry_network_errors: config.retry_network_errors,
                login_path: config.login_path.clone(),
                auth,
                on_unauthorized: RwLock::new(None),
                cache,
            }),
        })
    }

    /// Register the callback fired when the server rejects the session.
    ///
    /// Without a hook the client only logs that the user must sign in again.
    pub fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        *self
            .inner
            .on_unauthorized
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    /// Remove the unauthorized callback.
    pub fn clear_unauthorized_hook(&self) {
        *self
            .inner
            .on_unauthorized
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// API origin requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Endpoints under `/api/auth`.
    #[must_use]
    pub const fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    /// Endpoints under `/api/buyer`.
    #[must_use]
    pub const fn buyer(&self) -> BuyerApi<'_> {
        BuyerApi::new(self)
    }

    /// Endpoints under `/api/seller`.
    #[must_use]
    pub const fn seller(&self) -> SellerApi<'_> {
        SellerApi::new(self)
    }

    /// Endpoints under `/api/admin`.
    #[must_use]
    pub const fn admin(&self) -> AdminApi<'_> {
        AdminApi::new(self)
    }

    /// Endpoints under `/api/user`.
    #[must_use]
    pub const fn user(&self) -> UserApi<'_> {
        UserApi::new(self)
    }

    /// Drop every cached response.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send a request and decode the body by content type.
    ///
    /// `body`, when given, is sent as JSON.
    ///
    /// # Errors
    ///
    /// See [`ApiError`]; a 401 additionally clears the session.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Payload, ApiError> {
        let spec = RequestSpec {
            retry: self.inner.retry_network_errors,
            timeout: self.inner.request_timeout,
            url: self.endpoint(path, &[])?,
            method,
            body,
        };
        self.execute(spec).await
    }

    /// Probe `GET /api/health` with a short timeout and no retry.
    ///
    /// Transport failures are reported as an unhealthy status, not an error.
    #[instrument(skip(self))]
    pub async fn health(&self) -> HealthStatus {
        let started = std::time::Instant::now();
        let spec = match self.endpoint("/api/health", &[]) {
            Ok(url) => RequestSpec {
                method: Method::GET,
                url,
                body: None,
                timeout: HEALTH_TIMEOUT,
                retry: false,
            },
            Err(e) => {
                warn!(error = %e, "Cannot build health URL");
                return HealthStatus {
                    healthy: false,
                    latency: started.elapsed(),
                    status: None,
                };
            }
        };

        let result = self.execute(spec).await;
        let latency = started.elapsed();
        match result {
            Ok(payload) => HealthStatus {
                healthy: true,
                latency,
                status: match payload {
                    Payload::Json(v) => v
                        .get("status")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    Payload::Text(t) => Some(t.trim().to_string()),
                    Payload::Empty => None,
                },
            },
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                HealthStatus {
                    healthy: false,
                    latency,
                    status: None,
                }
            }
        }
    }

    /// Send a request and deserialize the (envelope-unwrapped) JSON body.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let value = self.call_value(method, path, query, body).await?;
        conversions::unwrap_data(value)
    }

    /// Send a request and return the raw JSON body.
    pub(crate) async fn call_value(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec {
            retry: self.inner.retry_network_errors,
            timeout: self.inner.request_timeout,
            url: self.endpoint(path, query)?,
            method,
            body,
        };
        self.execute(spec).await?.into_json()
    }

    pub(crate) fn cache(&self) -> &Cache<CacheKey, CacheValue> {
        &self.inner.cache
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    #[instrument(skip(self, spec), fields(method = %spec.method, path = %spec.url.path()))]
    async fn execute(&self, spec: RequestSpec) -> Result<Payload, ApiError> {
        let mut attempt = 0_u32;
        let response = loop {
            match self.send_once(&spec).await {
                Ok(response) => break response,
                Err(e) if attempt == 0 && spec.retry && is_retryable(&e, &spec.method) => {
                    attempt += 1;
                    debug!(error = %e, "Request failed before reaching the server, retrying once");
                }
                Err(e) if e.is_timeout() => return Err(ApiError::Timeout),
                Err(e) => return Err(ApiError::Network(e)),
            }
        };

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Network(e)
            }
        })?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(self.handle_unauthorized());
        }

        if !status.is_success() {
            let message = error_message(&text, is_json);
            return Err(match status.as_u16() {
                404 => ApiError::NotFound(message.unwrap_or_else(|| "Resource not found".to_string())),
                code if status.is_server_error() => {
                    error!(status = code, body = %truncate(&text), "Marketplace API server error");
                    ApiError::Server {
                        status: code,
                        message: message.unwrap_or_else(|| "Internal server error".to_string()),
                    }
                }
                code => ApiError::Status {
                    status: code,
                    message: message.unwrap_or_else(|| status.to_string()),
                },
            });
        }

        if text.trim().is_empty() {
            return Ok(Payload::Empty);
        }
        if is_json {
            return Ok(Payload::Json(serde_json::from_str(&text)?));
        }
        Ok(Payload::Text(text))
    }

    async fn send_once(&self, spec: &RequestSpec) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self
            .inner
            .http
            .request(spec.method.clone(), spec.url.clone())
            .timeout(spec.timeout)
            .header("X-Request-Id", request_id());

        if let Some(token) = self.inner.auth.token() {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        request.send().await
    }

    fn handle_unauthorized(&self) -> ApiError {
        self.inner.auth.clear_credentials();

        let hook = self
            .inner
            .on_unauthorized
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match hook {
            Some(hook) => hook(),
            None => warn!(
                login_path = %self.inner.login_path,
                "Session rejected by server; sign in again"
            ),
        }

        ApiError::AuthenticationRequired {
            login_path: self.inner.login_path.clone(),
        }
    }
}

/// Serialize a request body, mapping failures into `ApiError`.
pub(crate) fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(body)?)
}

/// Percent-encode a record id so it stays a single path segment.
pub(crate) fn segment(id: &str) -> Result<Cow<'_, str>, ApiError> {
    match id {
        "" | "." | ".." => Err(ApiError::InvalidId(id.to_string())),
        _ => Ok(urlencoding::encode(id)),
    }
}

fn is_retryable(error: &reqwest::Error, method: &Method) -> bool {
    error.is_connect() || (error.is_timeout() && *method == Method::GET)
}

fn request_id() -> HeaderValue {
    HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str, is_json: bool) -> Option<String> {
    if is_json && let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "msg"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return Some(message.to_string());
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || is_json {
        return None;
    }
    Some(truncate(trimmed))
}

fn truncate(text: &str) -> String {
    text.chars().take(ERROR_BODY_LIMIT).collect()
}
