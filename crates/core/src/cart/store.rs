//! Cart persistence.
//!
//! A [`CartStore`] owns a [`Cart`] and a [`CartStorage`] backend. It loads the
//! stored cart once when opened and writes the whole item list back after
//! every mutation, under the fixed key [`CART_STORAGE_KEY`].
//!
//! Loading fails open: missing, unreadable or corrupt data yields an empty
//! cart. Writing does not; a failed write is returned to the caller, with the
//! in-memory change already applied.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use thiserror::Error;

use super::{Cart, CartItem, CartLine};
use crate::types::ProductId;

/// Storage key under which the cart is kept.
pub const CART_STORAGE_KEY: &str = "cart";

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cart could not be serialized.
    #[error("cart serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable string key-value storage.
pub trait CartStorage {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `key` with `value`.
    #[must_use]
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl CartStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: CartStorage + ?Sized> CartStorage for &S {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).write(key, value)
    }
}

/// A cart bound to its storage.
#[derive(Debug)]
pub struct CartStore<S: CartStorage> {
    storage: S,
    cart: Cart,
}

impl<S: CartStorage> CartStore<S> {
    /// Load the stored cart, or start empty if there is none or it is unreadable.
    pub fn open(storage: S) -> Self {
        let raw = storage.read(CART_STORAGE_KEY).ok().flatten();
        let cart = Cart::from_json_or_empty(raw.as_deref());
        Self { storage, cart }
    }

    /// The current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        self.cart.items()
    }

    /// Sum of `price * quantity`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.cart.total()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.cart.count()
    }

    /// Add one unit of `line` and persist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cart cannot be written.
    pub fn add(&mut self, line: &CartLine) -> Result<(), StorageError> {
        self.cart.add(line);
        self.persist()
    }

    /// Remove the item for `id` (no-op if absent) and persist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cart cannot be written.
    pub fn remove(&mut self, id: ProductId) -> Result<bool, StorageError> {
        let removed = self.cart.remove(id);
        self.persist()?;
        Ok(removed)
    }

    /// Empty the cart and persist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cart cannot be written.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.cart.clear();
        self.persist()
    }

    /// Give back the storage backend.
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn persist(&self) -> Result<(), StorageError> {
        let json = self.cart.to_json()?;
        self.storage.write(CART_STORAGE_KEY, &json)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::ProductInput;

    fn widget() -> CartLine {
        CartLine::try_from(ProductInput {
            id: ProductId::new(1),
            sku: "A1".to_string(),
            name: "Widget".to_string(),
            base_price: "100".to_string(),
        })
        .unwrap()
    }

    struct BrokenStorage;

    impl CartStorage for BrokenStorage {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Backend("disk on fire".to_string()))
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Backend("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_open_empty_storage() {
        let store = CartStore::open(MemoryStorage::new());
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_open_corrupt_storage_starts_empty() {
        let storage = MemoryStorage::new().with_value(CART_STORAGE_KEY, "{broken");
        let store = CartStore::open(storage);
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_open_unreadable_storage_starts_empty() {
        let store = CartStore::open(BrokenStorage);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_every_mutation_is_written() {
        let storage = MemoryStorage::new();
        let mut store = CartStore::open(&storage);

        store.add(&widget()).unwrap();
        let saved = Cart::from_json_or_empty(storage.read(CART_STORAGE_KEY).unwrap().as_deref());
        assert_eq!(saved.count(), 1);

        store.add(&widget()).unwrap();
        let saved = Cart::from_json_or_empty(storage.read(CART_STORAGE_KEY).unwrap().as_deref());
        assert_eq!(saved.count(), 2);

        assert!(store.remove(ProductId::new(1)).unwrap());
        assert!(!store.remove(ProductId::new(1)).unwrap());
        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));

        store.add(&widget()).unwrap();
        store.clear().unwrap();
        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_reopen_restores_cart() {
        let storage = MemoryStorage::new();
        {
            let mut store = CartStore::open(&storage);
            store.add(&widget()).unwrap();
            store.add(&widget()).unwrap();
        }
        let reopened = CartStore::open(&storage);
        assert_eq!(reopened.count(), 2);
        assert_eq!(reopened.total(), Decimal::from(200));
    }

    #[test]
    fn test_write_failure_is_reported_but_applied() {
        let mut store = CartStore::open(BrokenStorage);
        assert!(store.add(&widget()).is_err());
        assert_eq!(store.count(), 1);
    }
}
