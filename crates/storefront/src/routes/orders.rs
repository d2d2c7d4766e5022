//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use wholesale_core::OrderId;

use crate::api::{ApiError, Order, OrderItem};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::NavView;
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub sku: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: i64,
    pub status: String,
    pub status_label: String,
    pub total: String,
    pub created_at: String,
    pub items: Vec<OrderItemView>,
    pub can_invoice: bool,
    pub can_pay: bool,
    pub client: Option<String>,
    pub client_email: Option<String>,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            name: item.product_name.clone(),
            sku: item.product_sku.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price_applied.to_string(),
        }
    }
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i64(),
            status: order.status.as_str().to_lowercase(),
            status_label: order.status.label().to_string(),
            total: order.total_amount.to_string(),
            created_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            items: order.items.iter().map(OrderItemView::from).collect(),
            can_invoice: order.status.allows_invoice(),
            can_pay: order.status.allows_payment(),
            client: order.client_name.clone().or_else(|| order.client_email.clone()),
            client_email: order.client_email.clone(),
        }
    }
}

/// Newest first.
pub(crate) fn order_views(mut orders: Vec<Order>) -> Vec<OrderView> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    orders.iter().map(OrderView::from).collect()
}

/// Query parameters for notices after a redirect.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub placed: Option<OrderId>,
    pub error: Option<String>,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub nav: NavView,
    pub orders: Vec<OrderView>,
    pub placed: Option<i64>,
    pub error: Option<String>,
}

/// Display the user's order history.
#[instrument(skip(state, session, auth))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<OrdersTemplate> {
    let orders = state.api().my_orders(&auth.token).await?;

    let error = query.error.as_deref().map(|code| match code {
        "payment" => "The payment could not be started. Please try again.".to_string(),
        _ => "Something went wrong. Please try again.".to_string(),
    });

    Ok(OrdersTemplate {
        nav: NavView::load(&session, Some(&auth.user)).await,
        orders: order_views(orders),
        placed: query.placed.map(|id| id.as_i64()),
        error,
    })
}

/// Download an order's invoice PDF.
#[instrument(skip(state, auth), fields(order_id = %id))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let pdf = state.api().invoice_pdf(&auth.token, id).await?;
    let disposition = format!("attachment; filename=\"invoice-{id}.pdf\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

/// Start an online payment and send the browser to the payment page.
#[instrument(skip(state, auth), fields(order_id = %id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    add_breadcrumb(
        "checkout",
        "Starting payment",
        Some(&[("order_id", id.to_string().as_str())]),
    );

    match state.api().payment_checkout(&auth.token, id).await {
        Ok(init_point) if init_point.starts_with("https://") || init_point.starts_with("http://") => {
            Ok(Redirect::to(&init_point).into_response())
        }
        Ok(init_point) => {
            tracing::warn!(init_point = %init_point, "Payment link is not an http(s) URL");
            Ok(Redirect::to("/orders?error=payment").into_response())
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Payment could not be started");
            Ok(Redirect::to("/orders?error=payment").into_response())
        }
    }
}
