//! Integration tests for the wholesale client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p wholesale-integration-tests
//! ```
//!
//! Each test starts the real storefront router on an ephemeral port, with a
//! throwaway `SQLite` session database and a `wiremock` server standing in
//! for the wholesale REST API. Requests go through a `reqwest` client with a
//! cookie store, so sessions behave as they do in a browser.
//!
//! # Test Categories
//!
//! - `api_client` - REST client against the mocked API
//! - `storefront_catalog` - Login, catalog page and access control
//! - `storefront_cart` - Cart aggregation, concurrent updates, checkout and logout
//! - `storefront_admin` - Back-office products, clients, import and reports

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::{Client, redirect};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wholesale_storefront::config::StorefrontConfig;
use wholesale_storefront::state::AppState;
use wholesale_storefront::{db, middleware, routes};

/// A running storefront wired to a mocked API.
pub struct TestContext {
    /// Mock of the wholesale REST API.
    pub api: MockServer,
    /// Browser-like client: keeps cookies, never follows redirects.
    pub client: Client,
    addr: SocketAddr,
    _data_dir: TempDir,
    server: JoinHandle<()>,
}

impl TestContext {
    pub async fn new() -> Self {
        let api = MockServer::start().await;
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let api_url = api.uri();
        let session_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.path().join("sessions.db").display()
        );
        let config = StorefrontConfig::from_lookup(|key| match key {
            "WHOLESALE_API_URL" => Some(api_url.clone()),
            "STOREFRONT_SESSION_DATABASE_URL" => Some(session_url.clone()),
            _ => None,
        })
        .expect("Invalid test configuration");

        let pool = db::create_pool(&config.session_database_url)
            .await
            .expect("Failed to open session database");
        let store = middleware::create_session_store(&pool)
            .await
            .expect("Failed to migrate session store");
        let session_layer = middleware::create_session_layer(store, &config);
        let state = AppState::new(&config, pool).expect("Failed to build app state");
        let app = routes::app(state, session_layer);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api,
            client,
            addr,
            _data_dir: data_dir,
            server,
        }
    }

    /// Absolute URL of a storefront path.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Log in as the user described by `claims`.
    ///
    /// Mounts a token endpoint that accepts any credentials and answers with
    /// a JWT carrying `claims`, then posts the login form.
    pub async fn login(&self, claims: &Value) -> reqwest::Response {
        Mock::given(method("POST"))
            .and(path("/api/token/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": fake_jwt(claims),
                "refresh": "refresh-token",
            })))
            .mount(&self.api)
            .await;

        self.client
            .post(self.url("/auth/login"))
            .form(&[("username", "norte"), ("password", "secret")])
            .send()
            .await
            .expect("Failed to post login form")
    }

    /// Post the add-to-cart form for `product` as a plain form submit.
    pub async fn add_to_cart(&self, product: &Value) -> reqwest::Response {
        let field = |name: &str| match &product[name] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.client
            .post(self.url("/cart/add"))
            .form(&[
                ("id", field("id")),
                ("sku", field("sku")),
                ("name", field("name")),
                ("base_price", field("base_price")),
                ("return_to", "/cart".to_string()),
            ])
            .send()
            .await
            .expect("Failed to post add-to-cart form")
    }

    /// GET a storefront page and return its status and body.
    pub async fn page(&self, path: &str) -> (reqwest::StatusCode, String) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to load page");
        let status = resp.status();
        let body = resp.text().await.expect("Failed to read body");
        (status, body)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// An unsigned JWT whose payload is `claims`.
pub fn fake_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Claims of a regular client account.
pub fn client_claims() -> Value {
    json!({
        "user_id": 7,
        "username": "norte",
        "role": "CLIENT",
        "company_name": "Repuestos Norte",
    })
}

/// Claims of a staff account.
pub fn staff_claims() -> Value {
    json!({
        "user_id": 1,
        "username": "admin",
        "role": "ADMIN",
        "is_staff": true,
    })
}

/// A product as `GET /api/products/` returns it.
pub fn product_json(id: i64, sku: &str, name: &str, base_price: &str) -> Value {
    json!({
        "id": id,
        "sku": sku,
        "name": name,
        "base_price": base_price,
        "stock": 10,
        "brand": "Acme",
        "category_details": {"name": "Bujes", "slug": "bujes"},
    })
}

/// Header value of the `Location` header, if any.
pub fn location(resp: &reqwest::Response) -> Option<&str> {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
