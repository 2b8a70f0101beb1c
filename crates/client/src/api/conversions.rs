//! Normalization of server payloads.
//!
//! The marketplace API is inconsistent about response shapes: some endpoints
//! wrap the body in `{ "success": true, "data": ... }`, lists arrive either
//! bare or under a named field, ids are `_id` or `id`, and products carry
//! their picture in any of `image`, `imageUrl`, `thumbnail` or `images[0]`
//! (itself a string or `{ "url": ... }`). Everything is folded into the
//! types in [`super::types`] here so nothing past this module has to guess.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use cartify_core::ProductId;

use super::ApiError;
use super::types::{AuthResponse, Product, SellerSummary, ServerCart};
use crate::cart::CartItem;
use crate::session::User;

// =============================================================================
// Envelopes
// =============================================================================

/// Strip a `{ "data": ... }` envelope, if present.
fn peel(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Take `field` out of an object, or return the value unchanged.
fn field_or_self(value: Value, field: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(field) => {
            map.remove(field).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Deserialize a possibly enveloped body.
pub(super) fn unwrap_data<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(peel(value))?)
}

/// Deserialize a list that is either the body itself or stored under `field`.
pub(super) fn list<T: DeserializeOwned>(value: Value, field: &str) -> Result<Vec<T>, ApiError> {
    match field_or_self(peel(value), field) {
        Value::Null => Ok(Vec::new()),
        array @ Value::Array(_) => Ok(serde_json::from_value(array)?),
        other => Err(ApiError::Malformed(format!(
            "expected a list of {field}, got {}",
            kind(&other)
        ))),
    }
}

/// Deserialize a single record that is either the body itself or under `field`.
pub(super) fn single<T: DeserializeOwned>(value: Value, field: &str) -> Result<T, ApiError> {
    Ok(serde_json::from_value(field_or_self(peel(value), field))?)
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Loose id references
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRef<I> {
    Bare(I),
    Populated {
        #[serde(alias = "_id")]
        id: I,
    },
}

/// Accept either a bare id or a populated object carrying `_id`/`id`.
pub(super) fn id_or_object<'de, D, I>(deserializer: D) -> Result<I, D::Error>
where
    D: Deserializer<'de>,
    I: Deserialize<'de>,
{
    Ok(match IdRef::<I>::deserialize(deserializer)? {
        IdRef::Bare(id) | IdRef::Populated { id } => id,
    })
}

// =============================================================================
// Products
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawImage {
    Url(String),
    Object { url: String },
}

impl RawImage {
    fn into_url(self) -> String {
        match self {
            Self::Url(url) | Self::Object { url } => url,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Name(String),
    Object { name: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSeller {
    Id(String),
    Summary(SellerSummary),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLikes {
    Count(u32),
    Users(Vec<Value>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    #[serde(alias = "_id")]
    id: ProductId,
    #[serde(alias = "title")]
    name: String,
    #[serde(default)]
    description: Option<String>,
    price: Decimal,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    images: Vec<RawImage>,
    #[serde(default)]
    category: Option<RawCategory>,
    #[serde(default, alias = "countInStock", alias = "quantity")]
    stock: Option<u32>,
    #[serde(default)]
    seller: Option<RawSeller>,
    #[serde(default)]
    likes: Option<RawLikes>,
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        let images: Vec<String> = raw
            .images
            .into_iter()
            .map(RawImage::into_url)
            .filter(|url| !url.is_empty())
            .collect();
        let image = [raw.image, raw.image_url, raw.thumbnail]
            .into_iter()
            .flatten()
            .find(|url| !url.is_empty())
            .or_else(|| images.first().cloned());

        Self {
            id: raw.id,
            name: raw.name,
            description: raw.description.unwrap_or_default(),
            price: raw.price,
            image,
            images,
            category: raw.category.map(|c| match c {
                RawCategory::Name(name) | RawCategory::Object { name } => name,
            }),
            stock: raw.stock,
            seller: raw.seller.map(|s| match s {
                RawSeller::Id(id) => SellerSummary {
                    id: Some(id.into()),
                    name: String::new(),
                },
                RawSeller::Summary(summary) => summary,
            }),
            likes: match raw.likes {
                None => 0,
                Some(RawLikes::Count(n)) => n,
                Some(RawLikes::Users(users)) => u32::try_from(users.len()).unwrap_or(u32::MAX),
            },
        }
    }
}

/// A single product, bare or under `product`.
pub(super) fn product(value: Value) -> Result<Product, ApiError> {
    single::<RawProduct>(value, "product").map(Product::from)
}

/// A product list, bare or under `field`.
pub(super) fn products(value: Value, field: &str) -> Result<Vec<Product>, ApiError> {
    Ok(list::<RawProduct>(value, field)?
        .into_iter()
        .map(Product::from)
        .collect())
}

// =============================================================================
// Server cart
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCartProduct {
    Populated(RawProduct),
    Id(ProductId),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCartLine {
    #[serde(alias = "productId")]
    product: RawCartProduct,
    #[serde(default = "one")]
    quantity: u32,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    name: Option<String>,
}

const fn one() -> u32 {
    1
}

impl RawCartLine {
    fn into_item(self) -> Result<CartItem, ApiError> {
        let mut item = match self.product {
            RawCartProduct::Populated(raw) => Product::from(raw).to_cart_item(),
            RawCartProduct::Id(id) => {
                let price = self.price.ok_or_else(|| {
                    ApiError::Malformed(format!("cart line {id} has no price"))
                })?;
                CartItem::new(id, String::new(), price)
            }
        };
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(name) = self.name.filter(|n| !n.is_empty()) {
            item.name = name;
        }
        item.quantity = self.quantity;
        Ok(item)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCart {
    #[serde(default)]
    items: Vec<RawCartLine>,
    #[serde(default, alias = "totalAmount", alias = "totalPrice")]
    total: Option<Decimal>,
}

/// The server cart: bare, under `cart`, or just an array of lines.
pub(super) fn server_cart(value: Value) -> Result<ServerCart, ApiError> {
    let raw = match field_or_self(peel(value), "cart") {
        Value::Null => RawCart {
            items: Vec::new(),
            total: None,
        },
        lines @ Value::Array(_) => RawCart {
            items: serde_json::from_value(lines)?,
            total: None,
        },
        other => serde_json::from_value(other)?,
    };

    let items = raw
        .items
        .into_iter()
        .filter(|line| line.quantity > 0)
        .map(RawCartLine::into_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ServerCart {
        items,
        total: raw.total,
    })
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuth {
    #[serde(alias = "accessToken")]
    token: Option<String>,
    user: Option<User>,
}

/// Token and user from a login or signup response.
pub(super) fn auth_response(value: Value) -> Result<AuthResponse, ApiError> {
    let raw: RawAuth = serde_json::from_value(peel(value))?;
    let token = raw
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Malformed("auth response has no token".to_string()))?;
    let user = raw
        .user
        .ok_or_else(|| ApiError::Malformed("auth response has no user".to_string()))?;
    Ok(AuthResponse {
        user,
        token: SecretString::from(token),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unwrap_data_with_and_without_envelope() {
        let wrapped: Vec<u32> = unwrap_data(json!({"success": true, "data": [1, 2]})).unwrap();
        let bare: Vec<u32> = unwrap_data(json!([1, 2])).unwrap();
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn test_list_under_field_or_bare() {
        let a: Vec<u32> = list(json!({"data": {"orders": [3]}}), "orders").unwrap();
        let b: Vec<u32> = list(json!([3]), "orders").unwrap();
        let c: Vec<u32> = list(json!({"data": null}), "orders").unwrap();
        assert_eq!(a, vec![3]);
        assert_eq!(b, vec![3]);
        assert!(c.is_empty());

        let err = list::<u32>(json!({"orders": "nope"}), "orders").unwrap_err();
        assert!(matches!(err, ApiError::Malformed(m) if m.contains("a string")));
    }

    #[test]
    fn test_product_image_resolution_order() {
        let p = product(json!({"_id": "a", "name": "A", "price": 1, "imageUrl": "u1", "images": ["u2"]})).unwrap();
        assert_eq!(p.image.as_deref(), Some("u1"));

        let p = product(json!({"id": "b", "name": "B", "price": 1, "images": [{"url": "u3"}]})).unwrap();
        assert_eq!(p.image.as_deref(), Some("u3"));
        assert_eq!(p.images, vec!["u3".to_string()]);

        let p = product(json!({"id": 7, "name": "C", "price": "2.50", "thumbnail": "", "images": []})).unwrap();
        assert_eq!(p.id, ProductId::new("7"));
        assert_eq!(p.image, None);
        assert_eq!(p.price, Decimal::new(250, 2));
    }

    #[test]
    fn test_product_seller_and_likes_shapes() {
        let p = product(json!({
            "data": {"product": {
                "_id": "p1", "title": "Aso-oke", "price": 9000,
                "seller": {"_id": "s1", "businessName": "Iseyin Looms"},
                "category": {"name": "Fabrics"},
                "likes": ["u1", "u2"]
            }}
        }))
        .unwrap();
        assert_eq!(p.name, "Aso-oke");
        assert_eq!(p.seller.unwrap().name, "Iseyin Looms");
        assert_eq!(p.category.as_deref(), Some("Fabrics"));
        assert_eq!(p.likes, 2);

        let p = product(json!({"_id": "p2", "name": "X", "price": 1, "seller": "s2", "likes": 5})).unwrap();
        assert_eq!(p.seller.unwrap().id.unwrap().as_str(), "s2");
        assert_eq!(p.likes, 5);
    }

    #[test]
    fn test_products_list() {
        let list = products(json!({"products": [
            {"_id": "a", "name": "A", "price": 1},
            {"_id": "b", "name": "B", "price": 2}
        ], "total": 2}), "products")
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].id, ProductId::new("b"));
    }

    #[test]
    fn test_server_cart_populated_and_bare_lines() {
        let cart = server_cart(json!({"data": {"cart": {
            "items": [
                {"product": {"_id": "p1", "name": "A", "price": 10, "image": "i"}, "quantity": 2},
                {"productId": "p2", "name": "B", "price": 5, "quantity": 3},
                {"productId": "p3", "price": 1, "quantity": 0}
            ],
            "totalAmount": 35
        }}}))
        .unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.items[0].image.as_deref(), Some("i"));
        assert_eq!(cart.items[1].name, "B");
        assert_eq!(cart.total, Some(Decimal::from(35)));
    }

    #[test]
    fn test_server_cart_empty_shapes() {
        assert!(server_cart(json!({"cart": null})).unwrap().items.is_empty());
        assert!(server_cart(json!([])).unwrap().items.is_empty());
        assert!(server_cart(json!({})).unwrap().items.is_empty());
    }

    #[test]
    fn test_server_cart_line_without_price_is_malformed() {
        let err = server_cart(json!({"items": [{"productId": "p1", "quantity": 1}]})).unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn test_auth_response() {
        let auth = auth_response(json!({
            "success": true,
            "token": "jwt",
            "user": {"_id": "u1", "email": "Ada@Example.com", "role": "buyer", "name": "Ada"}
        }))
        .unwrap();
        assert_eq!(auth.token.expose_secret(), "jwt");
        assert_eq!(auth.user.email.as_str(), "ada@example.com");

        let err = auth_response(json!({"user": {"_id": "u1", "email": "a@b.co", "role": "buyer"}})).unwrap_err();
        assert!(matches!(err, ApiError::Malformed(m) if m.contains("token")));
    }

    #[test]
    fn test_id_or_object() {
        #[derive(Deserialize)]
        struct Line {
            #[serde(deserialize_with = "id_or_object")]
            product: ProductId,
        }

        let bare: Line = serde_json::from_value(json!({"product": "p1"})).unwrap();
        let populated: Line = serde_json::from_value(json!({"product": {"_id": "p1", "name": "A"}})).unwrap();
        assert_eq!(bare.product, populated.product);
    }
}
