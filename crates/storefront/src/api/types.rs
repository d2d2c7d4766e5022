//! Wire types for the wholesale REST API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::cart::{OrderLine, ProductInput};
use wholesale_core::{OrderId, OrderStatus, Price, ProductId, UserId};

// =============================================================================
// Auth
// =============================================================================

/// Login form body for `POST /api/token/`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// JWT pair returned on login.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// Category summary embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

/// A catalog product.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Decimal string, e.g. `"1250.00"`.
    pub base_price: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category_details: Option<CategoryRef>,
}

impl Product {
    /// The fields the cart needs from this product.
    #[must_use]
    pub fn to_input(&self) -> ProductInput {
        ProductInput {
            id: self.id,
            sku: self.sku.clone(),
            name: self.name.clone(),
            base_price: self.base_price.clone(),
        }
    }

    /// Parsed price, if the API sent a valid one.
    #[must_use]
    pub fn price(&self) -> Option<Price> {
        Price::parse(&self.base_price).ok()
    }
}

/// Query parameters for `GET /api/products/`. Empty fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub min_price: String,
    #[serde(default)]
    pub max_price: String,
}

impl ProductFilter {
    /// Non-empty parameters as `(name, value)` pairs, in a stable order.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("name", self.name.as_str()),
            ("brand", self.brand.as_str()),
            ("category", self.category.as_str()),
            ("min_price", self.min_price.as_str()),
            ("max_price", self.max_price.as_str()),
        ]
        .into_iter()
        .map(|(key, value)| (key, value.trim()))
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Body of `POST /api/orders/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub items: Vec<OrderLine>,
}

/// The part of a created order the storefront uses.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    pub id: OrderId,
}

/// A line of a placed order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    pub product_name: String,
    #[serde(default)]
    pub product_sku: Option<String>,
    pub quantity: u32,
    /// Unit price the API applied when the order was created.
    pub unit_price_applied: Price,
}

/// A placed order. Admin listings also carry the client's name and email.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total_amount: Price,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
}

/// Body of `PATCH /api/admin/orders/{id}/`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

// =============================================================================
// Payments
// =============================================================================

/// Body of `POST /api/payments/checkout/`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PaymentRequest {
    pub order_id: OrderId,
}

/// Hosted payment page for an order.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentLink {
    pub init_point: String,
}

// =============================================================================
// Back office
// =============================================================================

/// A product as the back office sees it, inactive ones included.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminProduct {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_price: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub category_details: Option<CategoryRef>,
}

const fn default_true() -> bool {
    true
}

/// Query parameters for `GET /api/admin/products/` and `/api/admin/users/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminListQuery {
    pub search: String,
    /// `None` lists active and inactive entries alike.
    pub is_active: Option<bool>,
    /// One-based page number; `0` and `1` both mean the first page.
    pub page: u32,
}

impl AdminListQuery {
    /// Parameters to send, skipping defaults.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.page > 1 {
            pairs.push(("page", self.page.to_string()));
        }
        let search = self.search.trim();
        if !search.is_empty() {
            pairs.push(("search", search.to_string()));
        }
        if let Some(active) = self.is_active {
            pairs.push(("is_active", active.to_string()));
        }
        pairs
    }
}

/// Body of `PATCH /api/admin/products/{id}/`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// A client account.
#[derive(Debug, Clone, Deserialize)]
pub struct Client {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub client_number: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    /// Fraction taken off base prices, e.g. `0.10`.
    #[serde(default)]
    pub discount_rate: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Body of `POST /api/admin/users/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewClient {
    pub client_number: Option<String>,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub province: String,
    pub tax_id: String,
    pub discount_rate: Decimal,
    pub password: String,
}

/// Body of `PATCH /api/admin/users/{id}/` when (de)activating an account.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActiveUpdate {
    pub is_active: bool,
}

/// Outcome of `POST /api/products/import/`.
///
/// The API answers with this shape for both accepted (200) and rejected
/// (400) spreadsheets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportSummary {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub created: u32,
    #[serde(default)]
    pub updated: u32,
    #[serde(default)]
    pub log: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A spreadsheet export offered by `GET /api/export/{kind}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Products,
    Orders,
}

impl ReportKind {
    /// Path segment used by the API and the storefront routes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }

    /// Download name offered to the browser.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Products => "products.xlsx",
            Self::Orders => "orders.xlsx",
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(Self::Products),
            "orders" => Ok(Self::Orders),
            other => Err(format!("unknown report: {other}")),
        }
    }
}

/// A downloaded file: bytes plus the content type the API sent.
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// Listings
// =============================================================================

/// A list endpoint response: either a bare array or a paginated page.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Paginated {
        results: Vec<T>,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        next: Option<String>,
    },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    /// The listed items.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Paginated { results, .. } => results,
            Self::Plain(items) => items,
        }
    }

    /// The listed items with paging details.
    #[must_use]
    pub fn into_page(self) -> Page<T> {
        match self {
            Self::Paginated {
                results,
                count,
                next,
            } => Page {
                total: count.unwrap_or(results.len()),
                has_next: next.is_some(),
                items: results,
            },
            Self::Plain(items) => Page {
                total: items.len(),
                has_next: false,
                items,
            },
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Entries across all pages.
    pub total: usize,
    pub has_next: bool,
}
