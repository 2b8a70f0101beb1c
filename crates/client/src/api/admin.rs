//! `/api/admin` endpoints.

use serde_json::json;
use tracing::{info, instrument};

use cartify_core::{PayoutId, ReviewDecision, UserId, ValidationError, VerificationId};

use super::types::{AdminStats, Order, Payout, PendingVerification, UserSummary};
use super::{ApiClient, ApiError, Method, conversions, segment};

/// Platform moderation for admins.
#[derive(Debug, Clone, Copy)]
pub struct AdminApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AdminApi<'a> {
    pub(crate) const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn stats(&self) -> Result<AdminStats, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/admin/stats", &[], None)
            .await?;
        conversions::single(value, "stats")
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn users(&self) -> Result<Vec<UserSummary>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/admin/users", &[], None)
            .await?;
        conversions::list(value, "users")
    }

    /// Toggle a user's suspension; returns the updated row.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn suspend_user(&self, id: &UserId) -> Result<UserSummary, ApiError> {
        let path = format!("/api/admin/users/{}/suspend", segment(id.as_str())?);
        let value = self.client.call_value(Method::PUT, &path, &[], None).await?;
        let user: UserSummary = conversions::single(value, "user")?;
        info!(suspended = user.suspended, "User suspension changed");
        Ok(user)
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn pending_verifications(&self) -> Result<Vec<PendingVerification>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/admin/verifications/pending", &[], None)
            .await?;
        conversions::list(value, "verifications")
    }

    /// Approve or reject a seller's verification.
    ///
    /// A rejection must carry a reason.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a rejection without a reason.
    #[instrument(skip(self, reason), fields(verification_id = %id, decision = %decision))]
    pub async fn review_verification(
        &self,
        id: &VerificationId,
        decision: ReviewDecision,
        reason: Option<&str>,
    ) -> Result<(), ApiError> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if decision == ReviewDecision::Reject && reason.is_none() {
            return Err(ValidationError::Required("Rejection reason").into());
        }
        let path = format!("/api/admin/verifications/{}/review", segment(id.as_str())?);
        let body = json!({ "decision": decision, "reason": reason });
        self.client
            .call_value(Method::PUT, &path, &[], Some(body))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Orders & payouts
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/admin/orders", &[], None)
            .await?;
        conversions::list(value, "orders")
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn payouts(&self) -> Result<Vec<Payout>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/admin/payouts", &[], None)
            .await?;
        conversions::list(value, "payouts")
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(payout_id = %id))]
    pub async fn approve_payout(&self, id: &PayoutId) -> Result<Payout, ApiError> {
        let path = format!("/api/admin/payouts/{}/approve", segment(id.as_str())?);
        let value = self.client.call_value(Method::PUT, &path, &[], None).await?;
        conversions::single(value, "payout")
    }

    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a blank reason.
    #[instrument(skip(self, reason), fields(payout_id = %id))]
    pub async fn reject_payout(&self, id: &PayoutId, reason: &str) -> Result<Payout, ApiError> {
        if reason.trim().is_empty() {
            return Err(ValidationError::Required("Rejection reason").into());
        }
        let path = format!("/api/admin/payouts/{}/reject", segment(id.as_str())?);
        let value = self
            .client
            .call_value(Method::PUT, &path, &[], Some(json!({ "reason": reason.trim() })))
            .await?;
        conversions::single(value, "payout")
    }
}
