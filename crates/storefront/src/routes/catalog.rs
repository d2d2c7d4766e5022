//! Catalog route handler.
//!
//! One page: filter form, category tree on the side, product grid. Clicking
//! a category selects it as the filter; clicking the selected one again
//! clears it. The tree is always fully expanded here.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use tower_sessions::Session;
use tracing::instrument;

use wholesale_core::category::{Expansion, Selection, TreeRow, render_rows};

use crate::api::{ApiError, Product, ProductFilter};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::NavView;
use crate::state::AppState;

/// Pixels of indentation per tree level.
const INDENT_PX: usize = 16;

/// Category tree row display data for templates.
#[derive(Clone)]
pub struct CategoryRowView {
    pub name: String,
    pub indent_px: usize,
    pub product_count: u32,
    pub show_badge: bool,
    pub selected: bool,
    /// Catalog URL after clicking this row.
    pub href: String,
}

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: i64,
    pub sku: String,
    pub name: String,
    /// Raw decimal string, posted back with the add-to-cart form.
    pub base_price: String,
    pub price: String,
    pub stock: i64,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// False when the API sent a price the cart cannot accept.
    pub can_add: bool,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        let price = product.price();
        Self {
            id: product.id.as_i64(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            base_price: product.base_price.clone(),
            price: price.map_or_else(|| product.base_price.clone(), |p| p.to_string()),
            stock: product.stock,
            brand: product.brand.clone().filter(|b| !b.trim().is_empty()),
            category: product.category_details.as_ref().map(|c| c.name.clone()),
            can_add: price.is_some(),
        }
    }
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub nav: NavView,
    pub filter: ProductFilter,
    pub categories: Vec<CategoryRowView>,
    pub products: Vec<ProductCardView>,
    /// Catalog URL with the category filter removed.
    pub clear_category_href: String,
    /// Where add-to-cart forms come back to.
    pub return_to: String,
    pub error: Option<String>,
}

/// Catalog URL for `filter`, e.g. `/?category=bujes&max_price=500`.
#[must_use]
pub fn catalog_href(filter: &ProductFilter) -> String {
    let pairs = filter.pairs();
    if pairs.is_empty() {
        return "/".to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("/?{query}")
}

fn category_rows(rows: Vec<TreeRow>, filter: &ProductFilter, selection: &Selection) -> Vec<CategoryRowView> {
    rows.into_iter()
        .map(|row| {
            let next = ProductFilter {
                category: selection.toggled(&row.slug).as_str().to_string(),
                ..filter.clone()
            };
            CategoryRowView {
                indent_px: row.depth * INDENT_PX,
                product_count: row.product_count,
                show_badge: row.show_badge,
                selected: row.selected,
                href: catalog_href(&next),
                name: row.name,
            }
        })
        .collect()
}

/// Display the catalog.
#[instrument(skip(state, session, auth))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Query(filter): Query<ProductFilter>,
) -> Result<CatalogTemplate> {
    let api = state.api();
    let (tree, products) = tokio::join!(
        api.category_tree(&auth.token),
        api.list_products(&auth.token, &filter)
    );

    let selection = Selection::new(filter.category.clone());
    let rows = render_rows(&tree?, &selection, Expansion::All)?;

    let (products, error) = match products {
        Ok(products) => (products, None),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load products");
            (Vec::new(), Some("Products could not be loaded. Please try again.".to_string()))
        }
    };
    tracing::debug!(count = products.len(), "Products loaded");

    let clear_category_href = catalog_href(&ProductFilter {
        category: String::new(),
        ..filter.clone()
    });

    Ok(CatalogTemplate {
        nav: NavView::load(&session, Some(&auth.user)).await,
        categories: category_rows(rows, &filter, &selection),
        products: products.iter().map(ProductCardView::from).collect(),
        clear_category_href,
        return_to: catalog_href(&filter),
        filter,
        error,
    })
}
