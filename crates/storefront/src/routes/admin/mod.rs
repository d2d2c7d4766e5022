//! Back-office route handlers.
//!
//! Order management and the category tree live here; products, clients and
//! spreadsheet import/export have their own modules. The API checks staff
//! permissions again on every call.

pub mod clients;
pub mod data;
pub mod products;

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use wholesale_core::category::{
    CategoryNode, Expansion, ExpansionState, Selection, TreeRow, ancestors_of, build_forest,
    find_by_slug, render_rows,
};
use wholesale_core::{CategoryId, OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::NavView;
use crate::routes::orders::{OrderView, order_views};
use crate::state::AppState;

/// Pixels of indentation per tree level.
const INDENT_PX: usize = 20;

// =============================================================================
// Paging
// =============================================================================

/// Query parameter for one-based list pages.
fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|page| page.trim().parse::<u32>().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

/// `path?query` for a list page; `pairs` with empty values are left out.
fn list_href(path: &str, pairs: &[(&str, String)]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        if !value.is_empty() {
            query.append_pair(key, value);
        }
    }
    let query = query.finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// Previous/next links around the current page.
#[derive(Clone, Default)]
pub struct Pager {
    pub page: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

impl Pager {
    /// Links for `page` of a list at `path` filtered by `pairs`.
    fn new(path: &str, pairs: &[(&str, String)], page: u32, has_next: bool) -> Self {
        let href = |target: u32| {
            let mut all = pairs.to_vec();
            if target > 1 {
                all.push(("page", target.to_string()));
            }
            list_href(path, &all)
        };
        Self {
            page,
            prev_href: (page > 1).then(|| href(page - 1)),
            next_href: has_next.then(|| href(page + 1)),
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// One entry of a status `<select>`.
#[derive(Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn status_options(current: Option<OrderStatus>) -> Vec<StatusOption> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusOption {
            value: status.as_str(),
            label: status.label(),
            selected: current == Some(status),
        })
        .collect()
}

/// Admin order list query.
#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<String>,
}

/// Admin order row: the order plus its status picker.
#[derive(Clone)]
pub struct AdminOrderView {
    pub order: OrderView,
    pub status_options: Vec<StatusOption>,
}

/// Admin order list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub nav: NavView,
    pub orders: Vec<AdminOrderView>,
    pub filter_options: Vec<StatusOption>,
}

/// Parse an optional status filter; empty or unknown values mean "all".
fn parse_status_filter(raw: Option<&str>) -> Option<OrderStatus> {
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| OrderStatus::from_str(s).ok())
}

/// List every client's orders.
#[instrument(skip(state, session, auth))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<AdminOrdersTemplate> {
    let status = parse_status_filter(query.status.as_deref());
    let orders = state.api().admin_orders(&auth.token, status).await?;
    tracing::debug!(count = orders.len(), "Admin orders loaded");

    let orders = order_views(orders)
        .into_iter()
        .map(|order| {
            let current = OrderStatus::from_str(&order.status).ok();
            AdminOrderView {
                status_options: status_options(current),
                order,
            }
        })
        .collect();

    Ok(AdminOrdersTemplate {
        nav: NavView::load(&session, Some(&auth.user)).await,
        orders,
        filter_options: status_options(status),
    })
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Move an order to a new status.
#[instrument(skip(state, auth), fields(order_id = %id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let status = OrderStatus::from_str(&form.status).map_err(AppError::BadRequest)?;
    state
        .api()
        .update_order_status(&auth.token, id, status)
        .await?;
    tracing::info!(order_id = %id, status = %status, "Order status changed");

    Ok(Redirect::to("/admin/orders").into_response())
}

// =============================================================================
// Categories
// =============================================================================

/// Admin category tree query.
///
/// `open` lists expanded ids (`?open=1,4`); `focus` selects a category by
/// slug and expands its ancestors; `all` expands everything.
#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    pub open: Option<String>,
    pub focus: Option<String>,
    #[serde(default)]
    pub all: bool,
}

/// Category row display data for templates.
#[derive(Clone)]
pub struct AdminCategoryRowView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub indent_px: usize,
    pub product_count: u32,
    pub show_badge: bool,
    pub has_children: bool,
    pub expanded: bool,
    pub selected: bool,
    /// Same page with this row's expansion flipped.
    pub toggle_href: String,
}

/// Admin category tree template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/categories.html")]
pub struct AdminCategoriesTemplate {
    pub nav: NavView,
    pub rows: Vec<AdminCategoryRowView>,
    pub total: usize,
    pub orphans: usize,
    pub focus: String,
    pub focus_missing: bool,
}

fn parse_open_ids(raw: Option<&str>) -> ExpansionState {
    raw.unwrap_or_default()
        .split(',')
        .filter_map(|id| CategoryId::from_str(id).ok())
        .collect()
}

fn categories_href(state: &ExpansionState, focus: &Selection) -> String {
    let open = state
        .ids()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if !open.is_empty() {
        query.append_pair("open", &open);
    }
    if focus.is_active() {
        query.append_pair("focus", focus.as_str());
    }
    let query = query.finish();

    if query.is_empty() {
        "/admin/categories".to_string()
    } else {
        format!("/admin/categories?{query}")
    }
}

fn admin_category_rows(
    rows: Vec<TreeRow>,
    state: &ExpansionState,
    focus: &Selection,
) -> Vec<AdminCategoryRowView> {
    rows.into_iter()
        .map(|row| {
            let mut next = state.clone();
            next.toggle(row.id);
            AdminCategoryRowView {
                id: row.id.as_i64(),
                toggle_href: categories_href(&next, focus),
                indent_px: row.depth * INDENT_PX,
                product_count: row.product_count,
                show_badge: row.show_badge,
                has_children: row.has_children,
                expanded: row.expanded,
                selected: row.selected,
                name: row.name,
                slug: row.slug,
            }
        })
        .collect()
}

fn count_nodes(roots: &[CategoryNode]) -> usize {
    let mut stack: Vec<&CategoryNode> = roots.iter().collect();
    let mut count = 0;
    while let Some(node) = stack.pop() {
        count += 1;
        stack.extend(&node.children);
    }
    count
}

/// Display the category tree with per-node expansion.
#[instrument(skip(state, session, auth))]
pub async fn categories(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<CategoriesQuery>,
) -> Result<AdminCategoriesTemplate> {
    let flat = state.api().admin_categories(&auth.token).await?;
    let forest = build_forest(flat)?;
    if !forest.orphans.is_empty() {
        tracing::warn!(orphans = ?forest.orphans, "Categories with unknown parent shown at top level");
    }

    let focus = Selection::new(query.focus.unwrap_or_default());
    let mut expansion = parse_open_ids(query.open.as_deref());
    let focus_missing = focus.is_active() && find_by_slug(&forest.roots, focus.as_str()).is_none();
    for id in ancestors_of(&forest.roots, focus.as_str()) {
        expansion.expand(id);
    }

    let mode = if query.all {
        Expansion::All
    } else {
        Expansion::Only(&expansion)
    };
    let rows = render_rows(&forest.roots, &focus, mode)?;

    Ok(AdminCategoriesTemplate {
        nav: NavView::load(&session, Some(&auth.user)).await,
        rows: admin_category_rows(rows, &expansion, &focus),
        total: count_nodes(&forest.roots),
        orphans: forest.orphans.len(),
        focus: focus.as_str().to_string(),
        focus_missing,
    })
}
