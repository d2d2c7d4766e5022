//! Offline cart commands.
//!
//! The cart lives in `<data-dir>/cart.json` and survives between runs, the
//! same way the storefront keeps one cart per browser session.
//!
//! # Usage
//!
//! ```bash
//! ws-cli cart add --id 1 --sku A1 --name Widget --price 100
//! ws-cli cart show
//! ws-cli cart remove --id 1
//! ws-cli cart clear
//! ```
//!
//! # Environment Variables
//!
//! - `WHOLESALE_DATA_DIR` - Directory holding the cart file (default `.wholesale`)

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use wholesale_core::cart::{
    Cart, CartError, CartLine, CartStorage, CartStore, ProductInput, StorageError,
};
use wholesale_core::{Price, ProductId};

/// Errors that can occur during cart commands.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// The product given on the command line is not valid.
    #[error("Invalid product: {0}")]
    Product(#[from] CartError),

    /// The cart file could not be written.
    #[error("Cart storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Key-value storage with one JSON file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CartStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        // Write then rename so a crash never leaves a half-written cart.
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn open(data_dir: &Path) -> CartStore<FileStorage> {
    tracing::debug!(dir = %data_dir.display(), "Opening cart");
    CartStore::open(FileStorage::new(data_dir))
}

/// Render the cart as a plain-text table.
pub fn format_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty.\n".to_string();
    }

    let mut out = String::new();
    for item in cart.items() {
        let _ = writeln!(
            out,
            "{:>6}  {:<12} {:<30} {:>4} x {:>10} = {:>12}",
            item.id.to_string(),
            item.sku,
            item.name,
            item.quantity,
            item.price.to_string(),
            Price::new(item.line_total()).to_string(),
        );
    }
    let _ = writeln!(
        out,
        "{} units, total {}",
        cart.count(),
        Price::new(cart.total())
    );
    out
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    print!("{}", format_cart(cart));
}

/// Print the stored cart.
pub fn show(data_dir: &Path) {
    print_cart(open(data_dir).cart());
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns `CartCommandError` if the product is invalid or the cart cannot
/// be saved.
pub fn add(data_dir: &Path, input: ProductInput) -> Result<(), CartCommandError> {
    let line = CartLine::try_from(input)?;
    let mut store = open(data_dir);
    store.add(&line)?;
    tracing::info!(product_id = %line.id(), count = store.count(), "Added to cart");
    print_cart(store.cart());
    Ok(())
}

/// Remove a product. Unknown ids leave the cart unchanged.
///
/// # Errors
///
/// Returns `CartCommandError` if the cart cannot be saved.
pub fn remove(data_dir: &Path, id: ProductId) -> Result<(), CartCommandError> {
    let mut store = open(data_dir);
    if store.remove(id)? {
        tracing::info!(product_id = %id, "Removed from cart");
    } else {
        tracing::warn!(product_id = %id, "Product was not in the cart");
    }
    print_cart(store.cart());
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `CartCommandError` if the cart cannot be saved.
pub fn clear(data_dir: &Path) -> Result<(), CartCommandError> {
    open(data_dir).clear()?;
    tracing::info!("Cart cleared");
    Ok(())
}
