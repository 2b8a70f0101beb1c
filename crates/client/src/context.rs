//! The application context.
//!
//! [`Cartify`] owns one of each store plus the API client, wired together
//! explicitly. Drop it (or call [`Cartify::logout`]) to tear the session
//! down; nothing is held in globals.
//!
//! Cart operations go through the local [`CartStore`] first, then are
//! mirrored to the server on a best-effort basis. A server failure is logged
//! and returned, but never rolls the local cart back. Bringing the two sides
//! back in line is an explicit [`Cartify::pull_cart`] with a
//! [`ReconcilePolicy`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use cartify_core::{ConversationId, Email, MessageId, ProductId, SignupForm};

use crate::api::types::Message;
use crate::api::{ApiClient, ApiError};
use crate::cart::{CartItem, CartStore};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{AuthStore, User};
use crate::storage::Storage;

/// How to resolve differences between the local and server carts.
///
/// There is deliberately no `Default`: every caller picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Replace the local cart with the server's.
    ServerWins,
    /// Keep the local cart and push it to the server.
    KeepLocal,
}

/// Delivery state of an optimistically sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// Shown locally, not yet acknowledged.
    Pending,
    /// Accepted by the server.
    Sent(MessageId),
    /// Rejected or never delivered; carries the error text.
    Failed(String),
}

/// A message as the sender sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub conversation: ConversationId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub state: DeliveryState,
}

impl OutgoingMessage {
    fn pending(conversation: &ConversationId, text: &str) -> Self {
        Self {
            conversation: conversation.clone(),
            text: text.trim().to_string(),
            created_at: Utc::now(),
            state: DeliveryState::Pending,
        }
    }

    fn settle(mut self, result: &Result<Message, ApiError>) -> Self {
        self.state = match result {
            Ok(message) => {
                if let Some(at) = message.created_at {
                    self.created_at = at;
                }
                DeliveryState::Sent(message.id.clone())
            }
            Err(e) => DeliveryState::Failed(e.to_string()),
        };
        self
    }
}

/// Shared marketplace session: auth, cart and API client.
///
/// Cheaply cloneable; clones share all state.
#[derive(Clone)]
pub struct Cartify {
    inner: Arc<CartifyInner>,
}

struct CartifyInner {
    config: ClientConfig,
    auth: Arc<AuthStore>,
    cart: Arc<CartStore>,
    api: ApiClient,
    /// Serializes cart mutations that talk to the server.
    cart_sync: Mutex<()>,
}

impl std::fmt::Debug for Cartify {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartify")
            .field("api", &self.inner.api)
            .field("auth", &self.inner.auth)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Cartify {
    /// Restore the session and cart from `storage` and build the API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, ClientError> {
        let auth = Arc::new(AuthStore::load(Arc::clone(&storage)));
        let cart = Arc::new(CartStore::load(storage));
        let api = ApiClient::new(&config, Arc::clone(&auth))?;

        debug!(
            base_url = %config.api_base_url,
            authenticated = auth.is_authenticated(),
            cart_lines = cart.items().len(),
            "Cartify context created"
        );

        Ok(Self {
            inner: Arc::new(CartifyInner {
                config,
                auth,
                cart,
                api,
                cart_sync: Mutex::new(()),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn auth(&self) -> &AuthStore {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Sign in and store the session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a malformed email, or the API
    /// error if the credentials are rejected.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, ClientError> {
        let email = Email::parse(email).map_err(cartify_core::ValidationError::from)?;
        let auth = self.inner.api.auth().login(&email, password).await?;
        self.inner.auth.login(auth.user.clone(), auth.token);
        Ok(auth.user)
    }

    /// Register and sign in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` wrapping a validation failure or a server
    /// rejection.
    pub async fn signup(&self, form: SignupForm) -> Result<User, ClientError> {
        let auth = self.inner.api.auth().signup(form).await?;
        self.inner.auth.login(auth.user.clone(), auth.token);
        Ok(auth.user)
    }

    /// Re-fetch the signed-in user and store it.
    ///
    /// # Errors
    ///
    /// Returns the API error; a rejected token also clears the session.
    pub async fn refresh_user(&self) -> Result<User, ClientError> {
        let user = self.inner.api.auth().me().await?;
        self.inner.auth.update_user(user.clone());
        Ok(user)
    }

    /// End the session: credentials, user, cart and preferences are cleared
    /// from memory and storage, and cached responses are dropped.
    pub async fn logout(&self) {
        let _guard = self.inner.cart_sync.lock().await;
        self.inner.auth.logout();
        self.inner.cart.clear_cart();
        self.inner.api.invalidate_cache();
        info!("Signed out");
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add a line locally, then mirror it to the server when signed in.
    ///
    /// The local cart is updated even when this returns an error.
    ///
    /// # Errors
    ///
    /// Returns the server error from the mirror call.
    #[instrument(skip(self, item), fields(product_id = %item.id))]
    pub async fn add_to_cart(&self, item: CartItem) -> Result<(), ClientError> {
        let _guard = self.inner.cart_sync.lock().await;
        let id = item.id.clone();
        let quantity = item.quantity.max(1);
        self.inner.cart.add_to_cart(item);

        if !self.should_sync() {
            return Ok(());
        }
        let result = self.inner.api.buyer().add_to_cart(&id, quantity).await;
        sync_outcome("add", result)
    }

    /// Set a line's quantity; below 1 removes it.
    ///
    /// # Errors
    ///
    /// Returns the server error from the mirror call.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn update_quantity(&self, id: &ProductId, quantity: i64) -> Result<(), ClientError> {
        let _guard = self.inner.cart_sync.lock().await;
        let known = self.inner.cart.contains(id);
        self.inner.cart.update_quantity(id, quantity);

        if !known || !self.should_sync() {
            return Ok(());
        }
        let buyer = self.inner.api.buyer();
        let result = match self.inner.cart.get(id) {
            Some(line) => buyer.update_cart_item(id, line.quantity).await,
            None => buyer.remove_from_cart(id).await,
        };
        sync_outcome("update", result)
    }

    /// # Errors
    ///
    /// Returns the server error from the mirror call.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove_from_cart(&self, id: &ProductId) -> Result<(), ClientError> {
        let _guard = self.inner.cart_sync.lock().await;
        let known = self.inner.cart.contains(id);
        self.inner.cart.remove_from_cart(id);

        if !known || !self.should_sync() {
            return Ok(());
        }
        let result = self.inner.api.buyer().remove_from_cart(id).await;
        sync_outcome("remove", result)
    }

    /// # Errors
    ///
    /// Returns the server error from the mirror call.
    pub async fn clear_cart(&self) -> Result<(), ClientError> {
        let _guard = self.inner.cart_sync.lock().await;
        self.inner.cart.clear_cart();

        if !self.should_sync() {
            return Ok(());
        }
        let result = self.inner.api.buyer().clear_cart().await;
        sync_outcome("clear", result)
    }

    /// Reconcile the local cart with the server's.
    ///
    /// With [`ReconcilePolicy::ServerWins`] the local cart is replaced by the
    /// server's. With [`ReconcilePolicy::KeepLocal`] the server is brought in
    /// line with the local cart: missing or different lines are written and
    /// lines absent locally are removed. Returns the resulting cart.
    ///
    /// # Errors
    ///
    /// Returns the first server error. With `KeepLocal` earlier writes may
    /// already have been applied; the local cart is left as it was.
    #[instrument(skip(self))]
    pub async fn pull_cart(&self, policy: ReconcilePolicy) -> Result<Vec<CartItem>, ClientError> {
        let _guard = self.inner.cart_sync.lock().await;
        let buyer = self.inner.api.buyer();
        let server = buyer.cart().await?;

        match policy {
            ReconcilePolicy::ServerWins => {
                debug!(lines = server.items.len(), "Replacing local cart with server cart");
                self.inner.cart.replace_items(server.items);
            }
            ReconcilePolicy::KeepLocal => {
                let local = self.inner.cart.items();
                let remote: HashMap<&ProductId, u32> = server
                    .items
                    .iter()
                    .map(|line| (&line.id, line.quantity))
                    .collect();

                for line in &local {
                    match remote.get(&line.id) {
                        Some(&q) if q == line.quantity => {}
                        Some(_) => buyer.update_cart_item(&line.id, line.quantity).await?,
                        None => buyer.add_to_cart(&line.id, line.quantity).await?,
                    }
                }
                for line in &server.items {
                    if !local.iter().any(|l| l.id == line.id) {
                        buyer.remove_from_cart(&line.id).await?;
                    }
                }
                debug!(lines = local.len(), "Pushed local cart to server");
            }
        }
        Ok(self.inner.cart.items())
    }

    fn should_sync(&self) -> bool {
        self.inner.auth.is_authenticated()
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Send a chat message optimistically.
    ///
    /// `on_pending` receives the message before the request is made so it
    /// can be shown at once; the returned value carries the final state.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a blank message. Delivery
    /// failures are reported through [`DeliveryState::Failed`].
    pub async fn send_message<F>(
        &self,
        conversation: &ConversationId,
        text: &str,
        on_pending: F,
    ) -> Result<OutgoingMessage, ClientError>
    where
        F: FnOnce(&OutgoingMessage),
    {
        if text.trim().is_empty() {
            return Err(cartify_core::ValidationError::Required("Message").into());
        }
        let pending = OutgoingMessage::pending(conversation, text);
        on_pending(&pending);

        let result = self
            .inner
            .api
            .user()
            .send_message(conversation, &pending.text)
            .await;
        if let Err(e) = &result {
            warn!(conversation_id = %conversation, error = %e, "Message not delivered");
        }
        Ok(pending.settle(&result))
    }
}

fn sync_outcome(action: &str, result: Result<(), ApiError>) -> Result<(), ClientError> {
    result.map_err(|e| {
        warn!(action, error = %e, "Cart change kept locally but not saved to server");
        e.into()
    })
}
