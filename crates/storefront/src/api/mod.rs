//! Client for the wholesale REST API.
//!
//! # Architecture
//!
//! - The API is the source of truth for products, orders and permissions;
//!   the storefront keeps nothing but the session and the cart
//! - JWT bearer auth: every call takes the caller's access token
//! - The category tree is cached in-process via `moka` (TTL from config)
//! - List endpoints may answer with a bare array or a paginated
//!   `{"results": [...]}` page; both are accepted
//!
//! # Example
//!
//! ```rust,ignore
//! use wholesale_storefront::api::{ApiClient, Credentials};
//!
//! let client = ApiClient::new(&config.api)?;
//! let tokens = client.obtain_token(&Credentials { username, password }).await?;
//! let token = SecretString::from(tokens.access);
//! let tree = client.category_tree(&token).await?;
//! ```

pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use wholesale_core::category::{CategoryNode, FlatCategory};
use wholesale_core::{OrderId, OrderStatus, ProductId, UserId};

use crate::config::ApiConfig;

pub use types::{
    ActiveUpdate, AdminListQuery, AdminProduct, CategoryRef, Client, CreatedOrder, Credentials,
    Download, ImportSummary, Listing, NewClient, NewOrder, Order, OrderItem, Page, PaymentLink,
    PaymentRequest, Product, ProductFilter, ProductUpdate, ReportKind, StatusUpdate, TokenPair,
};

const CATEGORY_TREE_KEY: &str = "categories";

/// Content type of the spreadsheets the import endpoint accepts.
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Longest slice of a response body kept in errors and logs.
const BODY_EXCERPT_CHARS: usize = 200;

/// Errors that can occur when calling the wholesale API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing, expired or rejected credentials (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed (HTTP 403).
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Client for the wholesale REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    categories: Cache<&'static str, Arc<Vec<CategoryNode>>>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.category_cache_ttl)
            .build();

        // Endpoint paths are joined relative to the base, so it must end in '/'
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                categories,
            }),
        })
    }

    /// The API base URL (always ends in `/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request, mapping non-success statuses to `ApiError`.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        Self::check(request.send().await?).await
    }

    /// Map a non-success response to `ApiError`.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        // Get response body as text first for better error diagnostics
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(BODY_EXCERPT_CHARS)
            .collect();

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(url)),
            _ => {
                tracing::error!(
                    status = %status,
                    path = %url,
                    body = %body,
                    "Wholesale API returned non-success status"
                );
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Send a request and parse the JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(BODY_EXCERPT_CHARS * 2).collect::<String>(),
                "Failed to parse wholesale API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange username and password for a JWT pair.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for wrong credentials.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn obtain_token(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let url = self.endpoint("api/token/")?;
        self.send_json(self.request(Method::POST, url, None).json(credentials))
            .await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// The category tree, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the tree is not cached and cannot be fetched.
    #[instrument(skip(self, token))]
    pub async fn category_tree(
        &self,
        token: &SecretString,
    ) -> Result<Arc<Vec<CategoryNode>>, ApiError> {
        if let Some(tree) = self.inner.categories.get(CATEGORY_TREE_KEY).await {
            debug!("Category tree cache hit");
            return Ok(tree);
        }

        let url = self.endpoint("api/categories/")?;
        let listing: Listing<CategoryNode> = self
            .send_json(self.request(Method::GET, url, Some(token)))
            .await?;
        let tree = Arc::new(listing.into_vec());

        self.inner
            .categories
            .insert(CATEGORY_TREE_KEY, Arc::clone(&tree))
            .await;
        debug!(roots = tree.len(), "Category tree cached");
        Ok(tree)
    }

    /// Drop the cached category tree.
    pub async fn invalidate_categories(&self) {
        self.inner.categories.invalidate(CATEGORY_TREE_KEY).await;
    }

    /// Products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_products(
        &self,
        token: &SecretString,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, ApiError> {
        let mut url = self.endpoint("api/products/")?;
        let pairs = filter.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let listing: Listing<Product> = self
            .send_json(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(listing.into_vec())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the API rejects the order.
    #[instrument(skip(self, token, order), fields(lines = order.items.len()))]
    pub async fn create_order(
        &self,
        token: &SecretString,
        order: &NewOrder,
    ) -> Result<CreatedOrder, ApiError> {
        let url = self.endpoint("api/orders/")?;
        self.send_json(self.request(Method::POST, url, Some(token)).json(order))
            .await
    }

    /// Orders placed by the token's owner.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token))]
    pub async fn my_orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
        let url = self.endpoint("api/orders/my-orders/")?;
        let listing: Listing<Order> = self
            .send_json(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(listing.into_vec())
    }

    /// Invoice PDF for an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the invoice is unavailable.
    #[instrument(skip(self, token), fields(order_id = %order_id))]
    pub async fn invoice_pdf(
        &self,
        token: &SecretString,
        order_id: OrderId,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&format!("api/orders/{order_id}/invoice/"))?;
        let response = self
            .send(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Start an online payment; returns the hosted payment page URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the payment cannot be started.
    #[instrument(skip(self, token), fields(order_id = %order_id))]
    pub async fn payment_checkout(
        &self,
        token: &SecretString,
        order_id: OrderId,
    ) -> Result<String, ApiError> {
        let url = self.endpoint("api/payments/checkout/")?;
        let link: PaymentLink = self
            .send_json(
                self.request(Method::POST, url, Some(token))
                    .json(&PaymentRequest { order_id }),
            )
            .await?;
        Ok(link.init_point)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// All orders, optionally limited to one status.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-staff tokens.
    #[instrument(skip(self, token))]
    pub async fn admin_orders(
        &self,
        token: &SecretString,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, ApiError> {
        let mut url = self.endpoint("api/admin/orders/")?;
        if let Some(status) = status {
            url.query_pairs_mut().append_pair("status", status.as_str());
        }

        let listing: Listing<Order> = self
            .send_json(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(listing.into_vec())
    }

    /// Move an order to `status`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the API rejects the transition.
    #[instrument(skip(self, token), fields(order_id = %order_id, status = %status))]
    pub async fn update_order_status(
        &self,
        token: &SecretString,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/admin/orders/{order_id}/"))?;
        self.send(
            self.request(Method::PATCH, url, Some(token))
                .json(&StatusUpdate { status }),
        )
        .await?;
        Ok(())
    }

    /// Flat category list with parent pointers and product counts.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-staff tokens.
    #[instrument(skip(self, token))]
    pub async fn admin_categories(
        &self,
        token: &SecretString,
    ) -> Result<Vec<FlatCategory>, ApiError> {
        let url = self.endpoint("api/admin/categories/")?;
        let listing: Listing<FlatCategory> = self
            .send_json(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(listing.into_vec())
    }

    /// One page of products, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-staff tokens.
    #[instrument(skip(self, token))]
    pub async fn admin_products(
        &self,
        token: &SecretString,
        query: &AdminListQuery,
    ) -> Result<Page<AdminProduct>, ApiError> {
        let mut url = self.endpoint("api/admin/products/")?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let listing: Listing<AdminProduct> = self
            .send_json(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(listing.into_page())
    }

    /// Change some of a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the API rejects the change.
    #[instrument(skip(self, token, update), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        token: &SecretString,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/admin/products/{product_id}/"))?;
        self.send(self.request(Method::PATCH, url, Some(token)).json(update))
            .await?;
        Ok(())
    }

    /// Upload a product spreadsheet.
    ///
    /// A spreadsheet the API refuses (HTTP 400 with an import summary) is
    /// returned as an unsuccessful summary rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the upload fails for any other reason.
    #[instrument(skip(self, token, bytes), fields(size = bytes.len()))]
    pub async fn import_products(
        &self,
        token: &SecretString,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportSummary, ApiError> {
        let url = self.endpoint("api/products/import/")?;
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(XLSX_CONTENT_TYPE)?;
        let form = Form::new().part("file", part);

        let response = self
            .request(Method::POST, url, Some(token))
            .multipart(form)
            .send()
            .await?;
        if response.status() == StatusCode::BAD_REQUEST {
            let text = response.text().await?;
            if let Ok(summary) = serde_json::from_str::<ImportSummary>(&text) {
                return Ok(summary);
            }
            return Err(ApiError::Status {
                status: StatusCode::BAD_REQUEST.as_u16(),
                body: text.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        let text = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// One page of client accounts.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-staff tokens.
    #[instrument(skip(self, token))]
    pub async fn admin_clients(
        &self,
        token: &SecretString,
        query: &AdminListQuery,
    ) -> Result<Page<Client>, ApiError> {
        let mut url = self.endpoint("api/admin/users/")?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let listing: Listing<Client> = self
            .send_json(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(listing.into_page())
    }

    /// Create a client account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` if the API rejects the data.
    #[instrument(skip(self, token, client), fields(company = %client.company_name))]
    pub async fn create_client(
        &self,
        token: &SecretString,
        client: &NewClient,
    ) -> Result<Client, ApiError> {
        let url = self.endpoint("api/admin/users/")?;
        self.send_json(self.request(Method::POST, url, Some(token)).json(client))
            .await
    }

    /// Enable or disable a client account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the API rejects the change.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn set_client_active(
        &self,
        token: &SecretString,
        user_id: UserId,
        is_active: bool,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/admin/users/{user_id}/"))?;
        self.send(
            self.request(Method::PATCH, url, Some(token))
                .json(&ActiveUpdate { is_active }),
        )
        .await?;
        Ok(())
    }

    /// Delete a client account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the account cannot be deleted.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn delete_client(&self, token: &SecretString, user_id: UserId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/admin/users/{user_id}/"))?;
        self.send(self.request(Method::DELETE, url, Some(token)))
            .await?;
        Ok(())
    }

    /// Download a spreadsheet export.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when there is nothing to export.
    #[instrument(skip(self, token), fields(report = kind.as_str()))]
    pub async fn export_report(
        &self,
        token: &SecretString,
        kind: ReportKind,
    ) -> Result<Download, ApiError> {
        let url = self.endpoint(&format!("api/export/{}/", kind.as_str()))?;
        let response = self
            .send(self.request(Method::GET, url, Some(token)))
            .await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(XLSX_CONTENT_TYPE)
            .to_string();
        Ok(Download {
            content_type,
            bytes: response.bytes().await?.to_vec(),
        })
    }
}
