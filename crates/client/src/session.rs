//! Authenticated session state.
//!
//! [`AuthStore`] holds the signed-in user and their bearer token in memory
//! and mirrors both to [`Storage`]. It is created once per [`crate::Cartify`]
//! context and shared with the API client, which clears it when the server
//! rejects the token.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cartify_core::{Email, Role, UserId};

use crate::storage::{Storage, keys};

/// The signed-in principal, as returned by login and signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub email: Email,
    pub role: Role,
    #[serde(default)]
    pub name: String,
}

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    token: Option<SecretString>,
}

/// In-memory session mirrored to persistent storage.
pub struct AuthStore {
    state: RwLock<SessionState>,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("AuthStore")
            .field("user", &state.user)
            .field("token", &state.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl AuthStore {
    /// Restore the session persisted in `storage`.
    ///
    /// A stored user that fails to parse clears every auth key, leaving the
    /// store signed out.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let token = storage
            .get(keys::TOKEN)
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        let user = match storage.get(keys::USER) {
            None => None,
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Stored user is unreadable, clearing session");
                    if let Err(e) = storage.remove_all(&[keys::TOKEN, keys::USER]) {
                        warn!(error = %e, "Failed to clear stored session");
                    }
                    return Self::empty(storage);
                }
            },
        };

        debug!(
            restored_user = user.is_some(),
            restored_token = token.is_some(),
            "Session loaded"
        );

        Self {
            state: RwLock::new(SessionState { user, token }),
            storage,
        }
    }

    fn empty(storage: Arc<dyn Storage>) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            storage,
        }
    }

    /// Store a freshly authenticated session.
    pub fn login(&self, user: User, token: SecretString) {
        self.persist_token(&token);
        self.persist_user(&user);
        info!(user_id = %user.id, role = %user.role, "Signed in");

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.user = Some(user);
        state.token = Some(token);
    }

    /// Sign out, removing the session and all session-scoped storage keys.
    pub fn logout(&self) {
        self.reset(keys::SESSION_SCOPED);
        info!("Signed out");
    }

    /// Drop the token and user after the server rejected them.
    ///
    /// Unlike [`logout`](Self::logout) this leaves the cart and preferences in
    /// storage so they survive signing back in.
    pub fn clear_credentials(&self) {
        self.reset(&[keys::TOKEN, keys::USER]);
    }

    fn reset(&self, storage_keys: &[&str]) {
        if let Err(e) = self.storage.remove_all(storage_keys) {
            warn!(error = %e, "Failed to clear stored session");
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = SessionState::default();
    }

    /// Replace the stored user record (profile edits).
    pub fn update_user(&self, user: User) {
        self.persist_user(&user);
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user = Some(user);
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    /// The bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    /// Both a user and a token are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.user.is_some() && state.token.is_some()
    }

    fn has_role(&self, role: Role) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .as_ref()
            .is_some_and(|u| u.role == role)
    }

    #[must_use]
    pub fn is_buyer(&self) -> bool {
        self.has_role(Role::Buyer)
    }

    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.has_role(Role::Seller)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    fn persist_token(&self, token: &SecretString) {
        if let Err(e) = self.storage.set(keys::TOKEN, token.expose_secret()) {
            warn!(error = %e, "Failed to persist token");
        }
    }

    fn persist_user(&self, user: &User) {
        let result = serde_json::to_string(user)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set(keys::USER, &json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist user");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn user(role: Role) -> User {
        User {
            id: UserId::new("u1"),
            email: Email::parse("ada@example.com").unwrap(),
            role,
            name: "Ada".to_string(),
        }
    }

    fn store() -> (Arc<MemoryStorage>, AuthStore) {
        let storage = Arc::new(MemoryStorage::new());
        let auth = AuthStore::load(storage.clone());
        (storage, auth)
    }

    #[test]
    fn test_starts_signed_out() {
        let (_, auth) = store();
        assert!(!auth.is_authenticated());
        assert!(auth.current_user().is_none());
        assert!(!auth.is_buyer());
    }

    #[test]
    fn test_login_persists_and_sets_flags() {
        let (storage, auth) = store();
        auth.login(user(Role::Seller), SecretString::from("tok-1"));

        assert!(auth.is_authenticated());
        assert!(auth.is_seller());
        assert!(!auth.is_admin());
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("tok-1"));
        assert!(storage.get(keys::USER).unwrap().contains("ada@example.com"));
    }

    #[test]
    fn test_session_restored_from_storage() {
        let (storage, auth) = store();
        auth.login(user(Role::Buyer), SecretString::from("tok-2"));

        let restored = AuthStore::load(storage);
        assert!(restored.is_authenticated());
        assert_eq!(restored.current_user(), Some(user(Role::Buyer)));
        assert_eq!(restored.token().unwrap().expose_secret(), "tok-2");
    }

    #[test]
    fn test_unparseable_user_clears_session() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::TOKEN, "tok").unwrap();
        storage.set(keys::USER, "{broken").unwrap();
        storage.set(keys::CART, "[]").unwrap();

        let auth = AuthStore::load(storage.clone());
        assert!(!auth.is_authenticated());
        assert!(auth.token().is_none());
        assert!(storage.get(keys::TOKEN).is_none());
        assert!(storage.get(keys::USER).is_none());
        assert!(storage.get(keys::CART).is_some());
    }

    #[test]
    fn test_token_without_user_is_not_authenticated() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::TOKEN, "tok").unwrap();
        let auth = AuthStore::load(storage);
        assert!(auth.token().is_some());
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_logout_clears_session_scoped_keys() {
        let (storage, auth) = store();
        auth.login(user(Role::Buyer), SecretString::from("tok"));
        storage.set(keys::CART, "[]").unwrap();
        storage.set(keys::USER_PREFERENCES, "{}").unwrap();
        storage.set(keys::THEME, "dark").unwrap();

        auth.logout();

        assert!(!auth.is_authenticated());
        for key in keys::SESSION_SCOPED {
            assert!(storage.get(key).is_none(), "{key} should be cleared");
        }
        assert_eq!(storage.get(keys::THEME).as_deref(), Some("dark"));
    }

    #[test]
    fn test_clear_credentials_keeps_cart() {
        let (storage, auth) = store();
        auth.login(user(Role::Buyer), SecretString::from("tok"));
        storage.set(keys::CART, "[]").unwrap();

        auth.clear_credentials();

        assert!(!auth.is_authenticated());
        assert!(storage.get(keys::CART).is_some());
    }

    #[test]
    fn test_update_user() {
        let (storage, auth) = store();
        auth.login(user(Role::Buyer), SecretString::from("tok"));

        let mut renamed = user(Role::Buyer);
        renamed.name = "Ada Obi".to_string();
        auth.update_user(renamed.clone());

        assert_eq!(auth.current_user(), Some(renamed));
        assert!(storage.get(keys::USER).unwrap().contains("Ada Obi"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let (_, auth) = store();
        auth.login(user(Role::Buyer), SecretString::from("super-secret"));
        let debug = format!("{auth:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
