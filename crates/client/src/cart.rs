//! Client-side shopping cart.
//!
//! [`CartStore`] is the authoritative local cart: an ordered list of line
//! items keyed by product id, mirrored to the `cart` storage key after every
//! change. It never talks to the network; server synchronization is layered
//! on top by [`crate::Cartify`].
//!
//! Invariants:
//! - at most one line per product id (re-adding increments the quantity);
//! - every line has `quantity >= 1` (lowering below 1 removes the line).

use std::sync::{Arc, PoisonError, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cartify_core::{Money, ProductId};

use crate::storage::{Storage, keys};

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    /// Unit price in Naira.
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Seller display name.
    #[serde(default)]
    pub seller: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

impl CartItem {
    /// Create a line with quantity 1.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: None,
            seller: String::new(),
            quantity: 1,
        }
    }

    /// Set the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Set the seller display name.
    #[must_use]
    pub fn with_seller(mut self, seller: impl Into<String>) -> Self {
        self.seller = seller.into();
        self
    }

    /// Set the image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// `price × quantity`, saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// The local cart, shared through `Arc` and mirrored to storage.
pub struct CartStore {
    items: RwLock<Vec<CartItem>>,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Restore the cart persisted in `storage`.
    ///
    /// A corrupt stored cart is discarded. Stored lines are re-normalized so a
    /// hand-edited file cannot break the invariants.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let items = match storage.get(keys::CART) {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<CartItem>>(&raw) {
                Ok(stored) => normalize(stored),
                Err(e) => {
                    warn!(error = %e, "Stored cart is unreadable, starting empty");
                    if let Err(e) = storage.remove(keys::CART) {
                        warn!(error = %e, "Failed to remove stored cart");
                    }
                    Vec::new()
                }
            },
        };

        debug!(lines = items.len(), "Cart loaded");
        Self {
            items: RwLock::new(items),
            storage,
        }
    }

    /// Add `item`, merging with an existing line for the same product.
    ///
    /// A zero quantity counts as one.
    pub fn add_to_cart(&self, mut item: CartItem) {
        item.quantity = item.quantity.max(1);
        self.mutate(|items| {
            if let Some(line) = items.iter_mut().find(|line| line.id == item.id) {
                line.quantity = line.quantity.saturating_add(item.quantity);
            } else {
                items.push(item);
            }
        });
    }

    /// Set a line's quantity; anything below 1 removes the line.
    ///
    /// Unknown ids are ignored.
    pub fn update_quantity(&self, id: &ProductId, new_quantity: i64) {
        if new_quantity < 1 {
            self.remove_from_cart(id);
            return;
        }
        let quantity = u32::try_from(new_quantity).unwrap_or(u32::MAX);
        self.mutate(|items| {
            if let Some(line) = items.iter_mut().find(|line| &line.id == id) {
                line.quantity = quantity;
            }
        });
    }

    /// Remove the line for `id` if present.
    pub fn remove_from_cart(&self, id: &ProductId) {
        self.mutate(|items| items.retain(|line| &line.id != id));
    }

    /// Empty the cart and delete the stored copy.
    pub fn clear_cart(&self) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if let Err(e) = self.storage.remove(keys::CART) {
            warn!(error = %e, "Failed to remove stored cart");
        }
    }

    /// Replace every line at once (used when adopting the server's cart).
    pub fn replace_items(&self, items: Vec<CartItem>) {
        let items = normalize(items);
        self.mutate(move |current| *current = items);
    }

    /// `Σ price × quantity` over all lines, saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.read(|items| {
            items
                .iter()
                .map(CartItem::line_total)
                .fold(Decimal::ZERO, Decimal::saturating_add)
        })
    }

    /// The total as displayable money.
    #[must_use]
    pub fn cart_total_money(&self) -> Money {
        Money::naira(self.cart_total())
    }

    /// `Σ quantity` over all lines.
    #[must_use]
    pub fn cart_items_count(&self) -> u64 {
        self.read(|items| items.iter().map(|line| u64::from(line.quantity)).sum())
    }

    /// Snapshot of the lines in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.read(<[CartItem]>::to_vec)
    }

    /// The line for `id`, if present.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<CartItem> {
        self.read(|items| items.iter().find(|line| &line.id == id).cloned())
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.read(|items| items.iter().any(|line| &line.id == id))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read(<[CartItem]>::is_empty)
    }

    fn read<T>(&self, f: impl FnOnce(&[CartItem]) -> T) -> T {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        f(items.as_slice())
    }

    /// Apply a change and persist the result. Persistence failures are logged;
    /// the in-memory change always stands.
    fn mutate(&self, f: impl FnOnce(&mut Vec<CartItem>)) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *items);

        let result = serde_json::to_string(&*items)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set(keys::CART, &json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}

/// Merge duplicate ids and drop zero-quantity lines, keeping first-seen order.
fn normalize(lines: Vec<CartItem>) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(lines.len());
    for line in lines.into_iter().filter(|line| line.quantity > 0) {
        if let Some(existing) = merged.iter_mut().find(|m| m.id == line.id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            merged.push(line);
        }
    }
    merged
}
