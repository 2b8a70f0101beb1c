//! `/api/auth` endpoints.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument};

use cartify_core::{Email, MIN_PASSWORD_LENGTH, SignupForm, ValidationError};

use super::types::AuthResponse;
use super::{ApiClient, ApiError, Method, conversions, segment, to_body};
use crate::session::User;

/// Login, registration and password recovery.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token and user record.
    ///
    /// Does not touch the session; see [`crate::Cartify::login`].
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Malformed` if the response lacks a token or user.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &SecretString) -> Result<AuthResponse, ApiError> {
        let body = json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        let value = self
            .client
            .call_value(Method::POST, "/api/auth/login", &[], Some(body))
            .await?;
        let auth = conversions::auth_response(value)?;
        info!(user_id = %auth.user.id, role = %auth.user.role, "Signed in");
        Ok(auth)
    }

    /// Register a new buyer or seller account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` before sending if the form is invalid.
    #[instrument(skip(self, form), fields(role = %form.role))]
    pub async fn signup(&self, mut form: SignupForm) -> Result<AuthResponse, ApiError> {
        form.validate()?;
        let value = self
            .client
            .call_value(Method::POST, "/api/auth/register", &[], Some(to_body(&form)?))
            .await?;
        let auth = conversions::auth_response(value)?;
        info!(user_id = %auth.user.id, "Account created");
        Ok(auth)
    }

    /// The user the current token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::AuthenticationRequired` if the token is rejected.
    pub async fn me(&self) -> Result<User, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/auth/me", &[], None)
            .await?;
        conversions::single(value, "user")
    }

    /// Ask the server to email a reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn forgot_password(&self, email: &Email) -> Result<(), ApiError> {
        self.client
            .call_value(
                Method::POST,
                "/api/auth/forgot-password",
                &[],
                Some(json!({ "email": email.as_str() })),
            )
            .await?;
        Ok(())
    }

    /// Set a new password using the token from a reset link.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the password is too short.
    pub async fn reset_password(&self, token: &str, password: &SecretString) -> Result<(), ApiError> {
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            }
            .into());
        }
        let path = format!("/api/auth/reset-password/{}", segment(token.trim())?);
        self.client
            .call_value(
                Method::POST,
                &path,
                &[],
                Some(json!({ "password": password.expose_secret() })),
            )
            .await?;
        Ok(())
    }
}
