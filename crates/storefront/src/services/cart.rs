//! Session-backed cart operations.
//!
//! Each browser's cart lives in its session under [`session_keys::CART`] as a
//! JSON array of items. Every operation loads it, applies one change and
//! writes it back before the response goes out. Overlapping writes from one
//! browser are queued by
//! [`serialize_session_writes`](crate::middleware::serialize_session_writes),
//! so each mutation starts from the previous one's saved cart.

use tower_sessions::Session;
use tracing::{instrument, warn};

use wholesale_core::ProductId;
use wholesale_core::cart::{Cart, CartItem, CartLine, ProductInput};

use crate::error::{Result, add_breadcrumb};
use crate::models::session_keys;

/// Load the cart from the session.
///
/// Missing data yields an empty cart; so does data that no longer
/// deserializes, which is logged and then overwritten on the next save.
pub async fn load_cart(session: &Session) -> Cart {
    match session.get::<Vec<CartItem>>(session_keys::CART).await {
        Ok(items) => Cart::from_items(items.unwrap_or_default()),
        Err(e) => {
            warn!(error = %e, "Discarding unreadable cart");
            Cart::new()
        }
    }
}

/// Write the cart back to the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns `AppError::Cart` for invalid product data, or a session error.
#[instrument(skip(session, input), fields(product_id = %input.id))]
pub async fn add_product(session: &Session, input: ProductInput) -> Result<Cart> {
    let line = CartLine::try_from(input)?;
    let mut cart = load_cart(session).await;
    cart.add(&line);
    save_cart(session, &cart).await?;

    add_breadcrumb(
        "cart",
        "Added product",
        Some(&[("product_id", line.id().to_string().as_str())]),
    );
    tracing::info!(count = cart.count(), "Product added to cart");
    Ok(cart)
}

/// Remove a product's item. Unknown ids leave the cart unchanged.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(session), fields(product_id = %id))]
pub async fn remove_product(session: &Session, id: ProductId) -> Result<Cart> {
    let mut cart = load_cart(session).await;
    if cart.remove(id) {
        save_cart(session, &cart).await?;
        add_breadcrumb("cart", "Removed product", Some(&[("product_id", id.to_string().as_str())]));
    }
    Ok(cart)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear(session: &Session) -> Result<()> {
    save_cart(session, &Cart::new()).await
}
