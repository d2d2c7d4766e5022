//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//! GET  /health/ready           - Session database reachable
//!
//! # Catalog (requires auth)
//! GET  /                       - Filters, category tree and product grid
//!
//! # Cart (HTMX fragments or 303 redirects)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add one unit (returns count, triggers cart-updated)
//! POST /cart/remove            - Remove an item
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//! POST /cart/checkout          - Place the order (requires auth)
//!
//! # Orders (requires auth)
//! GET  /orders                 - Order history
//! GET  /orders/{id}/invoice    - Invoice PDF
//! POST /orders/{id}/pay        - Redirect to the payment page
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! POST /auth/logout            - Logout action
//!
//! # Back office (requires staff)
//! GET  /admin/orders           - All orders, ?status= filter
//! POST /admin/orders/{id}/status - Change an order's status
//! GET  /admin/categories       - Category tree, ?open=1,2 expansion
//! GET  /admin/products         - Products incl. inactive, ?search=&active=&page=
//! POST /admin/products/{id}    - Edit a product
//! POST /admin/products/{id}/active - Show or hide a product
//! GET  /admin/clients          - Client accounts, ?search=&page=
//! POST /admin/clients          - Create a client
//! POST /admin/clients/{id}/active - Enable or disable a client
//! POST /admin/clients/{id}/delete - Delete a client
//! GET  /admin/import           - Spreadsheet upload form
//! POST /admin/import           - Import products (multipart)
//! GET  /admin/reports          - Report list
//! GET  /admin/reports/{kind}   - Download products.xlsx or orders.xlsx
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{Session, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::middleware::serialize_session_writes;
use crate::models::CurrentUser;
use crate::services::cart::load_cart;
use crate::state::AppState;

/// Navigation bar data shared by every full page.
#[derive(Clone, Default)]
pub struct NavView {
    pub username: Option<String>,
    pub is_admin: bool,
    pub cart_count: u32,
}

impl NavView {
    /// Build the navigation bar for `user` and the session's cart.
    pub async fn load(session: &Session, user: Option<&CurrentUser>) -> Self {
        Self {
            username: user.map(|u| u.display_name().to_string()),
            is_admin: user.is_some_and(CurrentUser::is_admin),
            cart_count: load_cart(session).await.count(),
        }
    }
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .route("/checkout", post(cart::checkout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}/invoice", get(orders::invoice))
        .route("/{id}/pay", post(orders::pay))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the back-office routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", post(admin::update_status))
        .route("/categories", get(admin::categories))
        .route("/products", get(admin::products::index))
        .route("/products/{id}", post(admin::products::update))
        .route("/products/{id}/active", post(admin::products::set_active))
        .route(
            "/clients",
            get(admin::clients::index).post(admin::clients::create),
        )
        .route("/clients/{id}/active", post(admin::clients::set_active))
        .route("/clients/{id}/delete", post(admin::clients::delete))
        .route(
            "/import",
            get(admin::data::import_page)
                .post(admin::data::import_upload)
                .layer(DefaultBodyLimit::max(admin::data::MAX_UPLOAD_BYTES)),
        )
        .route("/reports", get(admin::data::reports))
        .route("/reports/{kind}", get(admin::data::download_report))
}

/// Create all page routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
}

/// The full application: health checks, pages, sessions and request tracing.
///
/// Static files and Sentry layers are added by the binary.
pub fn app(state: AppState, session_layer: SessionManagerLayer<SqliteStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(session_layer)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            serialize_session_writes,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies session database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Only same-site absolute paths are followed after a form post.
pub(crate) fn safe_return_path(candidate: Option<&str>, fallback: &'static str) -> String {
    match candidate.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}
