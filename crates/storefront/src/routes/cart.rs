//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives in the session (see `services::cart`); plain form
//! posts without HTMX get a redirect back to where they came from.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use wholesale_core::ProductId;
use wholesale_core::cart::{Cart, CartItem, ProductInput};

use crate::api::{ApiError, NewOrder};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::routes::{NavView, safe_return_path};
use crate::services::cart as cart_service;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    /// Decimal total, formatted by the `money` filter.
    pub total: String,
    pub item_count: u32,
}

// =============================================================================
// Type Conversions
// =============================================================================

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.as_i64(),
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.price.to_string(),
            line_total: item.line_total().to_string(),
        }
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            total: cart.total().to_string(),
            item_count: cart.count(),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub base_price: String,
    pub return_to: Option<String>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub id: ProductId,
    pub return_to: Option<String>,
}

/// Clear cart form data.
#[derive(Debug, Deserialize)]
pub struct ClearCartForm {
    pub return_to: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: NavView,
    pub cart: CartView,
    pub logged_in: bool,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("HX-Request")
}

/// Reply to a cart mutation.
///
/// HTMX callers get the new count badge plus a `cart-updated` trigger;
/// plain form posts are sent back with a 303.
fn mutation_response(headers: &HeaderMap, cart: &Cart, return_to: Option<&str>) -> Response {
    if is_htmx(headers) {
        return (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: cart.count(),
            },
        )
            .into_response();
    }
    Redirect::to(&safe_return_path(return_to, "/cart")).into_response()
}

/// Display cart page.
#[instrument(skip(session, user))]
pub async fn show(session: Session, OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    let cart = cart_service::load_cart(&session).await;

    CartShowTemplate {
        nav: NavView::load(&session, user.as_ref()).await,
        cart: CartView::from(&cart),
        logged_in: user.is_some(),
        error: None,
    }
}

/// Add one unit of a product to the cart.
#[instrument(skip(session, headers))]
pub async fn add(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let input = ProductInput {
        id: form.id,
        sku: form.sku,
        name: form.name,
        base_price: form.base_price,
    };
    let cart = cart_service::add_product(&session, input).await?;
    Ok(mutation_response(&headers, &cart, form.return_to.as_deref()))
}

/// Remove a product from the cart.
#[instrument(skip(session, headers))]
pub async fn remove(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let cart = cart_service::remove_product(&session, form.id).await?;
    Ok(mutation_response(&headers, &cart, form.return_to.as_deref()))
}

/// Empty the cart.
#[instrument(skip(session, headers))]
pub async fn clear(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ClearCartForm>,
) -> Result<Response> {
    cart_service::clear(&session).await?;
    Ok(mutation_response(&headers, &Cart::new(), form.return_to.as_deref()))
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: cart_service::load_cart(&session).await.count(),
    }
}

/// Place an order for everything in the cart.
///
/// On success the cart is emptied and the user lands on the order history.
/// If the API refuses the order the cart is kept and shown with the error.
#[instrument(skip(state, session, auth))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Result<Response> {
    let cart = cart_service::load_cart(&session).await;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let order = NewOrder {
        items: cart.order_lines(),
    };
    add_breadcrumb("checkout", "Submitting order", None);

    match state.api().create_order(&auth.token, &order).await {
        Ok(created) => {
            cart_service::clear(&session).await?;
            tracing::info!(
                order_id = %created.id,
                count = cart.count(),
                "Order placed"
            );
            Ok(Redirect::to(&format!("/orders?placed={}", created.id)).into_response())
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Order was not accepted");
            Ok(CartShowTemplate {
                nav: NavView::load(&session, Some(&auth.user)).await,
                cart: CartView::from(&cart),
                logged_in: true,
                error: Some("Your order could not be placed. Please try again.".to_string()),
            }
            .into_response())
        }
    }
}
