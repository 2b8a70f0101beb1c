//! `/api/seller` endpoints.

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, instrument};

use cartify_core::{
    OrderId, OrderStatus, PayoutRequest, ProductId, ValidationError, VerificationForm,
};

use super::types::{
    Order, Payout, Product, ProductInput, Reel, SellerDashboard, VerificationRecord, Wallet,
};
use super::{ApiClient, ApiError, Method, conversions, segment, to_body};

/// Catalog, fulfilment, payouts and verification for sellers.
#[derive(Debug, Clone, Copy)]
pub struct SellerApi<'a> {
    client: &'a ApiClient,
}

impl<'a> SellerApi<'a> {
    pub(crate) const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn dashboard(&self) -> Result<SellerDashboard, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/seller/dashboard", &[], None)
            .await?;
        conversions::single(value, "stats")
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// The seller's own listings. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/seller/products", &[], None)
            .await?;
        conversions::products(value, "products")
    }

    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a blank name or non-positive price.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        validate_product(input)?;
        let value = self
            .client
            .call_value(Method::POST, "/api/seller/products", &[], Some(to_body(input)?))
            .await?;
        self.client.invalidate_cache();
        let product = conversions::product(value)?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a blank name or non-positive price.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        validate_product(input)?;
        let path = format!("/api/seller/products/{}", segment(id.as_str())?);
        let value = self
            .client
            .call_value(Method::PUT, &path, &[], Some(to_body(input)?))
            .await?;
        self.client.invalidate_cache();
        conversions::product(value)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("/api/seller/products/{}", segment(id.as_str())?);
        self.client.call_value(Method::DELETE, &path, &[], None).await?;
        self.client.invalidate_cache();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn reels(&self) -> Result<Vec<Reel>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/seller/reels", &[], None)
            .await?;
        conversions::list(value, "reels")
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/seller/orders", &[], None)
            .await?;
        conversions::list(value, "orders")
    }

    /// Move an order along the fulfilment pipeline.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` if the server rejects the transition.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let path = format!("/api/seller/orders/{}/status", segment(id.as_str())?);
        let value = self
            .client
            .call_value(Method::PUT, &path, &[], Some(json!({ "status": status })))
            .await?;
        conversions::single(value, "order")
    }

    // =========================================================================
    // Money
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn wallet(&self) -> Result<Wallet, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/seller/wallet", &[], None)
            .await?;
        conversions::single(value, "wallet")
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn payouts(&self) -> Result<Vec<Payout>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/seller/payouts", &[], None)
            .await?;
        conversions::list(value, "payouts")
    }

    /// Request a withdrawal.
    ///
    /// The wallet is fetched first and the request checked against its
    /// available balance before anything is submitted.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the amount is not positive, exceeds
    /// the balance, or the bank account is invalid.
    #[instrument(skip(self, request), fields(amount = %request.amount))]
    pub async fn request_payout(&self, mut request: PayoutRequest) -> Result<Payout, ApiError> {
        let wallet = self.wallet().await?;
        request.validate(wallet.balance)?;

        let value = self
            .client
            .call_value(Method::POST, "/api/seller/payouts", &[], Some(to_body(&request)?))
            .await?;
        let payout: Payout = conversions::single(value, "payout")?;
        info!(payout_id = %payout.id, "Payout requested");
        Ok(payout)
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn verification_status(&self) -> Result<VerificationRecord, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/seller/verification", &[], None)
            .await?;
        conversions::single(value, "verification")
    }

    /// # Errors
    ///
    /// Returns `ApiError::Validation` before sending if the form is invalid.
    #[instrument(skip(self, form), fields(business = %form.business_name))]
    pub async fn submit_verification(
        &self,
        mut form: VerificationForm,
    ) -> Result<VerificationRecord, ApiError> {
        form.validate()?;
        let value = self
            .client
            .call_value(
                Method::POST,
                "/api/seller/verification",
                &[],
                Some(to_body(&form)?),
            )
            .await?;
        conversions::single(value, "verification")
    }
}

fn validate_product(input: &ProductInput) -> Result<(), ValidationError> {
    if input.name.trim().is_empty() {
        return Err(ValidationError::Required("Name"));
    }
    if input.price <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, price: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: String::new(),
            price: Decimal::from(price),
            category: "Fashion".to_string(),
            stock: 1,
            images: vec![],
        }
    }

    #[test]
    fn test_validate_product() {
        assert_eq!(validate_product(&input("Kaftan", 100)), Ok(()));
        assert_eq!(
            validate_product(&input("  ", 100)),
            Err(ValidationError::Required("Name"))
        );
        assert_eq!(
            validate_product(&input("Kaftan", 0)),
            Err(ValidationError::NonPositiveAmount)
        );
    }
}
