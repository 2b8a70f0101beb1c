//! `/api/user` endpoints shared by every role.

use serde_json::json;
use tracing::instrument;

use cartify_core::{ConversationId, PasswordChangeForm, UserId, ValidationError};

use super::types::{Conversation, Message, Preferences, ProfileUpdate};
use super::{ApiClient, ApiError, Method, conversions, segment, to_body};
use crate::session::User;

/// Profile, preferences and messaging.
#[derive(Debug, Clone, Copy)]
pub struct UserApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UserApi<'a> {
    pub(crate) const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn profile(&self) -> Result<User, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/user/profile", &[], None)
            .await?;
        conversions::single(value, "user")
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let value = self
            .client
            .call_value(Method::PUT, "/api/user/profile", &[], Some(to_body(update)?))
            .await?;
        conversions::single(value, "user")
    }

    /// # Errors
    ///
    /// Returns `ApiError::Validation` before sending if the form is invalid.
    #[instrument(skip_all)]
    pub async fn change_password(&self, form: &PasswordChangeForm) -> Result<(), ApiError> {
        form.validate()?;
        self.client
            .call_value(Method::PUT, "/api/user/password", &[], Some(to_body(form)?))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn preferences(&self) -> Result<Preferences, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/user/preferences", &[], None)
            .await?;
        conversions::single(value, "preferences")
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_preferences(&self, prefs: &Preferences) -> Result<Preferences, ApiError> {
        let value = self
            .client
            .call_value(Method::PUT, "/api/user/preferences", &[], Some(to_body(prefs)?))
            .await?;
        conversions::single(value, "preferences")
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/user/conversations", &[], None)
            .await?;
        conversions::list(value, "conversations")
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown conversation.
    pub async fn messages(&self, conversation: &ConversationId) -> Result<Vec<Message>, ApiError> {
        let path = format!(
            "/api/user/conversations/{}/messages",
            segment(conversation.as_str())?
        );
        let value = self.client.call_value(Method::GET, &path, &[], None).await?;
        conversions::list(value, "messages")
    }

    /// Post a message to an existing conversation.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a blank message.
    #[instrument(skip(self, text), fields(conversation_id = %conversation))]
    pub async fn send_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<Message, ApiError> {
        let text = message_text(text)?;
        let path = format!(
            "/api/user/conversations/{}/messages",
            segment(conversation.as_str())?
        );
        let value = self
            .client
            .call_value(Method::POST, &path, &[], Some(json!({ "text": text })))
            .await?;
        conversions::single(value, "message")
    }

    /// Open (or reuse) a conversation with `recipient` and post the first message.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a blank message.
    #[instrument(skip(self, text), fields(recipient = %recipient))]
    pub async fn start_conversation(
        &self,
        recipient: &UserId,
        text: &str,
    ) -> Result<Conversation, ApiError> {
        let text = message_text(text)?;
        let value = self
            .client
            .call_value(
                Method::POST,
                "/api/user/conversations",
                &[],
                Some(json!({ "recipientId": recipient, "text": text })),
            )
            .await?;
        conversions::single(value, "conversation")
    }
}

fn message_text(text: &str) -> Result<&str, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::Required("Message"));
    }
    Ok(text)
}
