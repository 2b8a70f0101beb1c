//! `/api/buyer` endpoints.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use cartify_core::{NotificationId, OrderId, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    BuyerDashboard, CheckoutRequest, Notification, Order, Product, ProductQuery, ServerCart,
    Wallet,
};
use super::{ApiClient, ApiError, Method, conversions, segment, to_body};

/// Browsing, cart, orders and notifications for buyers.
#[derive(Debug, Clone, Copy)]
pub struct BuyerApi<'a> {
    client: &'a ApiClient,
}

#[derive(Deserialize)]
struct SavedToggle {
    #[serde(default, alias = "isSaved")]
    saved: bool,
}

impl<'a> BuyerApi<'a> {
    pub(crate) const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn dashboard(&self) -> Result<BuyerDashboard, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/buyer/dashboard", &[], None)
            .await?;
        conversions::single(value, "stats")
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List products matching `query`.
    ///
    /// Results are cached for five minutes per distinct query.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or a product is malformed.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(products)) = self.client.cache().get(&key).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let value = self
            .client
            .call_value(Method::GET, "/api/buyer/products", &query.to_pairs(), None)
            .await?;
        let products = conversions::products(value, "products")?;
        self.client
            .cache()
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.client.cache().get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/api/buyer/products/{}", segment(id.as_str())?);
        let value = self.client.call_value(Method::GET, &path, &[], None).await?;
        let product = conversions::product(value)?;
        self.client
            .cache()
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Like a product. Its cached entries are dropped so the new count shows.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn like_product(&self, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("/api/buyer/products/{}/like", segment(id.as_str())?);
        self.client.call_value(Method::POST, &path, &[], None).await?;
        self.client.invalidate_cache();
        Ok(())
    }

    /// Products the buyer has saved for later.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn saved_items(&self) -> Result<Vec<Product>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/buyer/saved", &[], None)
            .await?;
        conversions::products(value, "savedItems")
    }

    /// Save or unsave a product; returns whether it is now saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn toggle_saved(&self, id: &ProductId) -> Result<bool, ApiError> {
        let path = format!("/api/buyer/saved/{}", segment(id.as_str())?);
        let toggle: SavedToggle = self.client.call(Method::POST, &path, &[], None).await?;
        Ok(toggle.saved)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The server-side cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or a line is malformed.
    pub async fn cart(&self) -> Result<ServerCart, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/buyer/cart", &[], None)
            .await?;
        conversions::server_cart(value)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn add_to_cart(&self, id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        let body = json!({ "productId": id, "quantity": quantity.max(1) });
        self.client
            .call_value(Method::POST, "/api/buyer/cart", &[], Some(body))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn update_cart_item(&self, id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        let path = format!("/api/buyer/cart/{}", segment(id.as_str())?);
        self.client
            .call_value(Method::PUT, &path, &[], Some(json!({ "quantity": quantity })))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove_from_cart(&self, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("/api/buyer/cart/{}", segment(id.as_str())?);
        self.client.call_value(Method::DELETE, &path, &[], None).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.client
            .call_value(Method::DELETE, "/api/buyer/cart", &[], None)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Malformed` for an empty checkout without sending it.
    #[instrument(skip(self, request), fields(lines = request.items.len(), total = %request.total_amount))]
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<Order, ApiError> {
        if request.items.is_empty() {
            return Err(ApiError::Malformed("checkout has no items".to_string()));
        }
        let value = self
            .client
            .call_value(Method::POST, "/api/buyer/orders", &[], Some(to_body(request)?))
            .await?;
        conversions::single(value, "order")
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/buyer/orders", &[], None)
            .await?;
        conversions::list(value, "orders")
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown id.
    pub async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let path = format!("/api/buyer/orders/{}", segment(id.as_str())?);
        let value = self.client.call_value(Method::GET, &path, &[], None).await?;
        conversions::single(value, "order")
    }

    /// Cancel an order that has not shipped yet.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` if the server refuses the cancellation.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let path = format!("/api/buyer/orders/{}/cancel", segment(id.as_str())?);
        let value = self.client.call_value(Method::PUT, &path, &[], None).await?;
        conversions::single(value, "order")
    }

    // =========================================================================
    // Notifications & wallet
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/buyer/notifications", &[], None)
            .await?;
        conversions::list(value, "notifications")
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), ApiError> {
        let path = format!("/api/buyer/notifications/{}/read", segment(id.as_str())?);
        self.client.call_value(Method::PUT, &path, &[], None).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn wallet(&self) -> Result<Wallet, ApiError> {
        let value = self
            .client
            .call_value(Method::GET, "/api/buyer/wallet", &[], None)
            .await?;
        conversions::single(value, "wallet")
    }
}
