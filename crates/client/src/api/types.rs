//! Marketplace API types.
//!
//! These are the validated shapes handed to callers. Payloads that arrive in
//! several historical shapes (products, server carts, auth responses) are
//! first decoded into private raw types in `conversions` and normalized into
//! these.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cartify_core::{
    ConversationId, MessageId, NotificationId, OrderId, OrderStatus, PayoutId, PayoutStatus,
    ProductId, ReelId, Role, UserId, VerificationId, VerificationStatus,
};

use crate::cart::CartItem;
use crate::session::User;

// =============================================================================
// Auth
// =============================================================================

/// Successful login or signup.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub user: User,
    pub token: secrecy::SecretString,
}

// =============================================================================
// Catalog
// =============================================================================

/// Seller as embedded in products, orders and conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    #[serde(default, alias = "_id")]
    pub id: Option<UserId>,
    #[serde(default, alias = "businessName", alias = "storeName")]
    pub name: String,
}

/// A product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Primary image, resolved from whichever field the server used.
    pub image: Option<String>,
    /// All image URLs, primary first.
    pub images: Vec<String>,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub seller: Option<SellerSummary>,
    pub likes: u32,
}

impl Product {
    /// A cart line for one unit of this product.
    #[must_use]
    pub fn to_cart_item(&self) -> CartItem {
        let mut item = CartItem::new(self.id.clone(), self.name.clone(), self.price);
        item.image.clone_from(&self.image);
        if let Some(seller) = &self.seller {
            item.seller.clone_from(&seller.name);
        }
        item
    }
}

/// Filters for product listings.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.trim().to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Create or update payload for a seller's product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub stock: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// A short vertical video attached to a seller or product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reel {
    #[serde(alias = "_id")]
    pub id: ReelId,
    #[serde(alias = "video", alias = "url")]
    pub video_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub product: Option<ProductId>,
    #[serde(default)]
    pub views: u64,
}

// =============================================================================
// Cart & orders
// =============================================================================

/// The cart as the server currently sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCart {
    pub items: Vec<CartItem>,
    /// Server-computed total, when reported.
    pub total: Option<Decimal>,
}

/// Delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lga: Option<String>,
    pub phone: String,
}

/// One product line of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Order placement request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    pub shipping_address: Address,
    pub payment_method: String,
    /// Client-side total, sent so the server can reject stale prices.
    pub total_amount: Decimal,
}

impl CheckoutRequest {
    /// Build a checkout from cart lines.
    #[must_use]
    pub fn from_cart(items: &[CartItem], shipping_address: Address, payment_method: &str) -> Self {
        Self {
            items: items
                .iter()
                .map(|line| CheckoutLine {
                    product_id: line.id.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            total_amount: items.iter().map(CartItem::line_total).sum(),
            shipping_address,
            payment_method: payment_method.to_string(),
        }
    }
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(alias = "product", deserialize_with = "super::conversions::id_or_object")]
    pub product_id: ProductId,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(alias = "totalAmount")]
    pub total: Decimal,
    pub status: OrderStatus,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Dashboards & money
// =============================================================================

/// Buyer dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuyerDashboard {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub delivered_orders: u64,
    pub saved_items: u64,
    pub total_spent: Decimal,
}

/// Seller dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SellerDashboard {
    #[serde(alias = "totalRevenue")]
    pub total_sales: Decimal,
    pub total_orders: u64,
    pub pending_orders: u64,
    pub total_products: u64,
}

/// Platform-wide counters for admins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_buyers: u64,
    pub total_sellers: u64,
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub pending_verifications: u64,
    pub pending_payouts: u64,
}

/// A buyer's or seller's wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Wallet {
    /// Withdrawable now.
    #[serde(alias = "availableBalance")]
    pub balance: Decimal,
    /// Held until orders are delivered.
    #[serde(alias = "pendingBalance")]
    pub pending: Decimal,
    pub total_earned: Decimal,
}

/// A seller payout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    #[serde(alias = "_id")]
    pub id: PayoutId,
    pub amount: Decimal,
    pub status: PayoutStatus,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Verification
// =============================================================================

/// A seller's own verification record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    #[serde(default, alias = "verificationStatus")]
    pub status: VerificationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A submission awaiting admin review.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    #[serde(alias = "_id")]
    pub id: VerificationId,
    pub seller: SellerSummary,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Users & messaging
// =============================================================================

/// A user row in the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, alias = "isSuspended")]
    pub suspended: bool,
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// Per-user preferences. Unknown keys are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

const fn default_true() -> bool {
    true
}

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: NotificationId,
    pub message: String,
    #[serde(default, alias = "isRead")]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A chat thread between two users.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(alias = "_id")]
    pub id: ConversationId,
    #[serde(default)]
    pub participants: Vec<SellerSummary>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, alias = "unreadCount")]
    pub unread: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id")]
    pub id: MessageId,
    #[serde(alias = "senderId", deserialize_with = "super::conversions::id_or_object")]
    pub sender: UserId,
    #[serde(alias = "content", alias = "message")]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_accepts_server_shape() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "_id": "o1",
            "items": [{"product": "p1", "name": "Ankara", "price": 4500, "quantity": 2}],
            "totalAmount": 9000,
            "status": "Pending",
            "createdAt": "2026-03-01T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(order.id, OrderId::new("o1"));
        assert_eq!(order.total, Decimal::from(9000));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items[0].product_id, ProductId::new("p1"));
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_dashboards_default_missing_fields() {
        let dashboard: SellerDashboard =
            serde_json::from_value(serde_json::json!({"totalRevenue": "1200.50"})).unwrap();
        assert_eq!(dashboard.total_sales, Decimal::new(120_050, 2));
        assert_eq!(dashboard.total_orders, 0);
    }

    #[test]
    fn test_preferences_keep_unknown_keys() {
        let prefs: Preferences =
            serde_json::from_value(serde_json::json!({"theme": "dark", "language": "yo"})).unwrap();
        assert!(prefs.email_notifications);
        assert_eq!(prefs.extra["language"], "yo");

        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["language"], "yo");
        assert_eq!(json["emailNotifications"], true);
    }

    #[test]
    fn test_checkout_from_cart() {
        let items = vec![
            CartItem::new(1_u64, "A", Decimal::from(10)).with_quantity(2),
            CartItem::new(2_u64, "B", Decimal::from(5)).with_quantity(3),
        ];
        let address = Address {
            street: "12 Marina".to_string(),
            city: "Lagos Island".to_string(),
            state: "Lagos".to_string(),
            lga: None,
            phone: "08030000000".to_string(),
        };

        let request = CheckoutRequest::from_cart(&items, address, "card");
        assert_eq!(request.total_amount, Decimal::from(35));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["items"][1]["productId"], "2");
        assert_eq!(json["items"][1]["quantity"], 3);
        assert_eq!(json["paymentMethod"], "card");
    }

    #[test]
    fn test_product_to_cart_item() {
        let product = Product {
            id: ProductId::new("p9"),
            name: "Adire scarf".to_string(),
            description: String::new(),
            price: Decimal::from(3500),
            image: Some("https://cdn.example.com/p9.jpg".to_string()),
            images: vec![],
            category: None,
            stock: Some(4),
            seller: Some(SellerSummary {
                id: None,
                name: "Abeokuta Dyes".to_string(),
            }),
            likes: 0,
        };

        let item = product.to_cart_item();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.seller, "Abeokuta Dyes");
        assert_eq!(item.image.as_deref(), Some("https://cdn.example.com/p9.jpg"));
    }
}
