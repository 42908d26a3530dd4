//! Session-scoped shopping carts.
//!
//! The cart store is owned by [`crate::state::AppState`] and handed to
//! handlers explicitly - it is the single authority for cart contents.
//! Each browser session holds at most one cart ID (see [`session_keys`]);
//! only the handler serving that session writes to its cart, so entries have
//! single-writer semantics even though the store itself is shared.
//!
//! Carts are in-memory with a TTL: an abandoned cart simply expires. Orders
//! are the durable record and live in the content backend.

use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use driftwood_core::{CartId, ProductId};

/// Session keys used by the cart and checkout flows.
pub mod session_keys {
    /// Key for storing the cart ID.
    pub const CART_ID: &str = "cart_id";

    /// Key for the one-time checkout form token.
    pub const CHECKOUT_TOKEN: &str = "checkout_token";
}

/// Maximum number of live carts held in memory.
const MAX_CARTS: u64 = 10_000;

/// How long an untouched cart survives.
const CART_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One line of a shopping cart.
///
/// `unit_price` is the undiscounted price; the discount percentage (0-100)
/// is applied at display and order time by `crate::pricing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub discount_percentage: Decimal,
}

/// An ordered collection of cart items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// The items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an item, merging quantities when the product is already present.
    fn add(&mut self, item: CartItem) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Set the quantity of a product line; quantity 0 removes the line.
    fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) {
        if quantity == 0 {
            self.items.retain(|item| &item.product_id != product_id);
        } else if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
        {
            item.quantity = quantity;
        }
    }

    /// Remove a product line entirely.
    fn remove(&mut self, product_id: &ProductId) {
        self.items.retain(|item| &item.product_id != product_id);
    }
}

/// In-memory cart storage keyed by cart ID.
#[derive(Clone)]
pub struct CartStore {
    carts: Cache<CartId, Cart>,
}

impl CartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            carts: Cache::builder()
                .max_capacity(MAX_CARTS)
                .time_to_live(CART_TTL)
                .build(),
        }
    }

    /// Fetch a cart by ID. Unknown or expired IDs read as an empty cart.
    pub async fn get(&self, cart_id: &CartId) -> Cart {
        self.carts.get(cart_id).await.unwrap_or_default()
    }

    /// Add an item to the cart, merging quantities for repeated products.
    pub async fn add_item(&self, cart_id: &CartId, item: CartItem) -> Cart {
        let mut cart = self.get(cart_id).await;
        cart.add(item);
        self.carts.insert(cart_id.clone(), cart.clone()).await;
        cart
    }

    /// Set the quantity of a product line; quantity 0 removes it.
    pub async fn set_quantity(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Cart {
        let mut cart = self.get(cart_id).await;
        cart.set_quantity(product_id, quantity);
        self.carts.insert(cart_id.clone(), cart.clone()).await;
        cart
    }

    /// Remove a product line from the cart.
    pub async fn remove_item(&self, cart_id: &CartId, product_id: &ProductId) -> Cart {
        let mut cart = self.get(cart_id).await;
        cart.remove(product_id);
        self.carts.insert(cart_id.clone(), cart.clone()).await;
        cart
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Item {id}"),
            unit_price: Decimal::new(1999, 2),
            quantity,
            discount_percentage: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn test_unknown_cart_reads_empty() {
        let store = CartStore::new();
        let cart = store.get(&CartId::random()).await;
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_merges_quantities_per_product() {
        let store = CartStore::new();
        let cart_id = CartId::random();

        store.add_item(&cart_id, item("p1", 1)).await;
        let cart = store.add_item(&cart_id, item("p1", 2)).await;

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.unit_count(), 3);
    }

    #[tokio::test]
    async fn test_items_keep_insertion_order() {
        let store = CartStore::new();
        let cart_id = CartId::random();

        store.add_item(&cart_id, item("p2", 1)).await;
        store.add_item(&cart_id, item("p1", 1)).await;
        let cart = store.add_item(&cart_id, item("p3", 1)).await;

        let ids: Vec<&str> = cart
            .items()
            .iter()
            .map(|item| item.product_id.as_str())
            .collect();
        assert_eq!(ids, ["p2", "p1", "p3"]);
    }

    #[tokio::test]
    async fn test_zero_quantity_removes_line() {
        let store = CartStore::new();
        let cart_id = CartId::random();

        store.add_item(&cart_id, item("p1", 2)).await;
        let cart = store
            .set_quantity(&cart_id, &ProductId::new("p1"), 0)
            .await;

        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_carts_are_isolated_by_id() {
        let store = CartStore::new();
        let first = CartId::random();
        let second = CartId::random();

        store.add_item(&first, item("p1", 1)).await;
        assert!(store.get(&second).await.is_empty());
        assert_eq!(store.get(&first).await.unit_count(), 1);
    }
}
