//! Cart aggregator.
//!
//! A [`Cart`] is an ordered list of [`CartItem`]s with at most one item per
//! product id: adding a product that is already present bumps its quantity
//! instead of adding a row. Unit price, sku and name are copied from the
//! product when it is first added and are never refreshed; the API re-prices
//! the order when it is submitted.
//!
//! Persistence lives in [`store`]: a cart serializes to a JSON array of items
//! and is written back after every mutation.

pub mod store;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Price, PriceError, ProductId};

pub use store::{CART_STORAGE_KEY, CartStorage, CartStore, MemoryStorage, StorageError};

/// Errors raised when a product cannot become a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// A required text field is empty.
    #[error("product field '{0}' is required")]
    MissingField(&'static str),

    /// The product price is not a valid non-negative decimal.
    #[error("product price: {0}")]
    InvalidPrice(#[from] PriceError),
}

/// Product data as the catalog hands it to the cart.
///
/// `base_price` stays a string because that is how the API serializes
/// decimals; it is parsed once, in [`CartLine::try_from`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub base_price: String,
}

/// A validated product, ready to be added to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    id: ProductId,
    sku: String,
    name: String,
    price: Price,
}

impl CartLine {
    /// The product id.
    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.id
    }

    /// The captured unit price.
    #[must_use]
    pub const fn price(&self) -> Price {
        self.price
    }
}

impl TryFrom<ProductInput> for CartLine {
    type Error = CartError;

    fn try_from(input: ProductInput) -> Result<Self, Self::Error> {
        let sku = input.sku.trim().to_string();
        if sku.is_empty() {
            return Err(CartError::MissingField("sku"));
        }
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CartError::MissingField("name"));
        }
        let price = Price::parse(&input.base_price)?;

        Ok(Self {
            id: input.id,
            sku,
            name,
            price,
        })
    }
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Unit price captured when the product was first added.
    pub price: Price,
    pub quantity: u32,
}

impl CartItem {
    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.times(self.quantity)
    }
}

/// Checkout payload entry: which product, how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// The client-side shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from previously stored items.
    ///
    /// Items sharing an id are folded into the first occurrence so the
    /// one-item-per-id invariant holds even for hand-edited data. Items with
    /// a zero quantity are dropped.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items.into_iter().filter(|item| item.quantity > 0) {
            match cart.items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
                None => cart.items.push(item),
            }
        }
        cart
    }

    /// Add one unit of `line`.
    ///
    /// If the product is already in the cart its quantity goes up by one and
    /// the stored price is kept; otherwise a new item with quantity one is
    /// appended.
    pub fn add(&mut self, line: &CartLine) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == line.id) {
            item.quantity = item.quantity.saturating_add(1);
            return;
        }
        self.items.push(CartItem {
            id: line.id,
            sku: line.sku.clone(),
            name: line.name.clone(),
            price: line.price,
            quantity: 1,
        });
    }

    /// Remove the item for `id`. Returns whether an item was removed.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up the item for `id`.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `price * quantity` over all items.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities over all items.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// The checkout payload for this cart.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.items
            .iter()
            .map(|item| OrderLine {
                product_id: item.id,
                quantity: item.quantity,
            })
            .collect()
    }

    /// Serialize the items as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.items)
    }

    /// Restore a cart from its JSON form, falling back to an empty cart when
    /// `raw` is absent or cannot be parsed.
    #[must_use]
    pub fn from_json_or_empty(raw: Option<&str>) -> Self {
        raw.and_then(|json| serde_json::from_str::<Vec<CartItem>>(json).ok())
            .map(Self::from_items)
            .unwrap_or_default()
    }
}
