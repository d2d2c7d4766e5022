//! Back-office product list and editing.

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

use wholesale_core::{Price, ProductId};

use super::{Pager, list_href, parse_page};
use crate::api::{AdminListQuery, AdminProduct, ProductUpdate};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::{NavView, safe_return_path};
use crate::state::AppState;

const LIST_PATH: &str = "/admin/products";

/// Product list query: `?search=&active=active|inactive&page=`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub search: Option<String>,
    pub active: Option<String>,
    pub page: Option<String>,
}

fn parse_active(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::trim) {
        Some("active") => Some(true),
        Some("inactive") => Some(false),
        _ => None,
    }
}

/// Product row display data for templates.
#[derive(Clone)]
pub struct AdminProductView {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: String,
    /// Raw decimal string for the edit form.
    pub base_price: String,
    pub price: String,
    pub stock: i64,
    pub brand: String,
    pub supplier: String,
    pub category: Option<String>,
    pub is_active: bool,
}

impl From<&AdminProduct> for AdminProductView {
    fn from(product: &AdminProduct) -> Self {
        Self {
            id: product.id.as_i64(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            base_price: product.base_price.clone(),
            price: Price::parse(&product.base_price)
                .map_or_else(|_| product.base_price.clone(), |price| price.to_string()),
            stock: product.stock,
            brand: product.brand.clone().unwrap_or_default(),
            supplier: product.supplier.clone().unwrap_or_default(),
            category: product.category_details.as_ref().map(|c| c.name.clone()),
            is_active: product.is_active,
        }
    }
}

/// Admin product list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub nav: NavView,
    pub products: Vec<AdminProductView>,
    pub total: usize,
    pub search: String,
    pub active: String,
    pub pager: Pager,
    /// This page, posted back by the row forms.
    pub return_to: String,
}

/// List products, inactive ones included.
#[instrument(skip(state, session, auth))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<ProductsQuery>,
) -> Result<AdminProductsTemplate> {
    let search = query.search.unwrap_or_default().trim().to_string();
    let is_active = parse_active(query.active.as_deref());
    let active = match is_active {
        Some(true) => "active",
        Some(false) => "inactive",
        None => "",
    };
    let page = parse_page(query.page.as_deref());

    let listing = state
        .api()
        .admin_products(
            &auth.token,
            &AdminListQuery {
                search: search.clone(),
                is_active,
                page,
            },
        )
        .await?;
    tracing::debug!(count = listing.items.len(), total = listing.total, "Admin products loaded");

    let mut pairs = vec![("search", search.clone()), ("active", active.to_string())];
    let pager = Pager::new(LIST_PATH, &pairs, page, listing.has_next);
    if page > 1 {
        pairs.push(("page", page.to_string()));
    }
    let return_to = list_href(LIST_PATH, &pairs);

    Ok(AdminProductsTemplate {
        nav: NavView::load(&session, Some(&auth.user)).await,
        products: listing.items.iter().map(AdminProductView::from).collect(),
        total: listing.total,
        search,
        active: active.to_string(),
        pager,
        return_to,
    })
}

/// Product edit form data.
#[derive(Debug, Deserialize)]
pub struct ProductEditForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_price: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub supplier: String,
    pub return_to: Option<String>,
}

impl ProductEditForm {
    /// The PATCH body for this form. Empty text fields clear the value.
    fn to_update(&self) -> std::result::Result<ProductUpdate, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("product name is required".to_string());
        }
        let base_price = Price::parse(&self.base_price).map_err(|e| e.to_string())?;
        let stock = match self.stock.trim() {
            "" => None,
            raw => Some(
                raw.parse::<i64>()
                    .ok()
                    .filter(|stock| *stock >= 0)
                    .ok_or_else(|| format!("invalid stock: {raw}"))?,
            ),
        };

        Ok(ProductUpdate {
            name: Some(name.to_string()),
            description: Some(self.description.trim().to_string()),
            base_price: Some(base_price),
            stock,
            brand: Some(self.brand.trim().to_string()),
            supplier: Some(self.supplier.trim().to_string()),
            is_active: None,
        })
    }
}

/// Save a product's edited fields.
#[instrument(skip(state, auth, form), fields(product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductEditForm>,
) -> Result<Response> {
    let update = form.to_update().map_err(AppError::BadRequest)?;
    state.api().update_product(&auth.token, id, &update).await?;
    tracing::info!(product_id = %id, "Product updated");

    Ok(Redirect::to(&safe_return_path(form.return_to.as_deref(), LIST_PATH)).into_response())
}

/// Visibility toggle form data.
#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    pub is_active: bool,
    pub return_to: Option<String>,
}

/// Show or hide a product in the catalog.
#[instrument(skip(state, auth, form), fields(product_id = %id, is_active = form.is_active))]
pub async fn set_active(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<ProductId>,
    Form(form): Form<ActiveForm>,
) -> Result<Response> {
    let update = ProductUpdate {
        is_active: Some(form.is_active),
        ..ProductUpdate::default()
    };
    state.api().update_product(&auth.token, id, &update).await?;
    tracing::info!(product_id = %id, is_active = form.is_active, "Product visibility changed");

    Ok(Redirect::to(&safe_return_path(form.return_to.as_deref(), LIST_PATH)).into_response())
}
