//! Integration tests for the session cart, checkout and order pages.
//!
//! Run with: cargo test -p wholesale-integration-tests

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use wholesale_integration_tests::{TestContext, client_claims, location, product_json};

fn widget() -> serde_json::Value {
    product_json(1, "A1", "Widget", "100")
}

fn gadget() -> serde_json::Value {
    product_json(2, "B2", "Gadget", "50")
}

async fn cart_count(ctx: &TestContext) -> String {
    let (status, body) = ctx.page("/cart/count").await;
    assert_eq!(status, StatusCode::OK);
    body
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_empty_cart_page() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx.page("/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Your cart is empty."));
    assert!(cart_count(&ctx).await.contains(">0</span>"));
}

#[tokio::test]
async fn test_adding_same_product_twice_merges() {
    let ctx = TestContext::new().await;

    let resp = ctx.add_to_cart(&widget()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/cart"));
    ctx.add_to_cart(&widget()).await;

    let (status, body) = ctx.page("/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("<td>Widget</td>").count(), 1);
    assert!(body.contains("<td>2</td>"));
    assert!(body.contains("$200.00"));
    assert!(body.contains("2 units"));
}

#[tokio::test]
async fn test_totals_across_products() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart(&widget()).await;
    ctx.add_to_cart(&gadget()).await;
    ctx.add_to_cart(&widget()).await;

    let (_, body) = ctx.page("/cart").await;
    // Insertion order is kept
    assert!(body.find("Widget").unwrap() < body.find("Gadget").unwrap());
    assert!(body.contains("3 units"));
    assert!(body.contains("$250.00"));
    assert!(cart_count(&ctx).await.contains(">3</span>"));
}

#[tokio::test]
async fn test_htmx_add_returns_badge() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .post(ctx.url("/cart/add"))
        .header("HX-Request", "true")
        .form(&[
            ("id", "1"),
            ("sku", "A1"),
            ("name", "Widget"),
            ("base_price", "100"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("HX-Trigger").and_then(|v| v.to_str().ok()),
        Some("cart-updated")
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains(r#"id="cart-count""#));
    assert!(body.contains(">1</span>"));
}

#[tokio::test]
async fn test_concurrent_adds_are_all_counted() {
    let ctx = TestContext::new().await;
    // First add creates the session cookie the concurrent requests share
    ctx.add_to_cart(&widget()).await;

    let mut adds = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let client = ctx.client.clone();
        let url = ctx.url("/cart/add");
        adds.spawn(async move {
            client
                .post(url)
                .header("HX-Request", "true")
                .form(&[
                    ("id", "1"),
                    ("sku", "A1"),
                    ("name", "Widget"),
                    ("base_price", "100"),
                ])
                .send()
                .await
                .unwrap()
                .status()
        });
    }
    while let Some(status) = adds.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    assert!(cart_count(&ctx).await.contains(">21</span>"));
    let (_, body) = ctx.page("/cart").await;
    assert!(body.contains("<td>21</td>"));
    assert!(body.contains("$2100.00"));
}

#[tokio::test]
async fn test_concurrent_mixed_mutations_keep_every_change() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart(&gadget()).await;

    let mut requests = tokio::task::JoinSet::new();
    for i in 0..10 {
        let client = ctx.client.clone();
        let url = ctx.url("/cart/add");
        let (id, sku, name) = if i % 2 == 0 {
            ("1", "A1", "Widget")
        } else {
            ("3", "C3", "Sprocket")
        };
        requests.spawn(async move {
            client
                .post(url)
                .header("HX-Request", "true")
                .form(&[("id", id), ("sku", sku), ("name", name), ("base_price", "10")])
                .send()
                .await
                .unwrap()
                .status()
        });
    }
    while let Some(status) = requests.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    let (_, body) = ctx.page("/cart").await;
    assert_eq!(body.matches("<td>Widget</td>").count(), 1);
    assert_eq!(body.matches("<td>Sprocket</td>").count(), 1);
    assert!(body.contains("11 units"));
}

#[tokio::test]
async fn test_invalid_product_is_rejected() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .add_to_cart(&product_json(1, "A1", "Widget", "not-a-price"))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx.add_to_cart(&product_json(1, "", "Widget", "10")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(cart_count(&ctx).await.contains(">0</span>"));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart(&widget()).await;
    ctx.add_to_cart(&gadget()).await;

    let resp = ctx
        .client
        .post(ctx.url("/cart/remove"))
        .form(&[("id", "1"), ("return_to", "/cart")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), Some("/cart"));
    assert!(cart_count(&ctx).await.contains(">1</span>"));

    // Removing an absent product changes nothing
    ctx.client
        .post(ctx.url("/cart/remove"))
        .form(&[("id", "99")])
        .send()
        .await
        .unwrap();
    assert!(cart_count(&ctx).await.contains(">1</span>"));

    let resp = ctx
        .client
        .post(ctx.url("/cart/clear"))
        .form(&[("return_to", "https://evil.example")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), Some("/cart"));
    assert!(cart_count(&ctx).await.contains(">0</span>"));
}

#[tokio::test]
async fn test_cart_survives_login_and_logout() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart(&widget()).await;

    ctx.login(&client_claims()).await;
    assert!(cart_count(&ctx).await.contains(">1</span>"));

    let resp = ctx
        .client
        .post(ctx.url("/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), Some("/auth/login"));
    assert!(cart_count(&ctx).await.contains(">1</span>"));

    let resp = ctx.client.get(ctx.url("/orders")).send().await.unwrap();
    assert_eq!(location(&resp), Some("/auth/login"));
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_requires_login() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart(&widget()).await;

    let resp = ctx.client.post(ctx.url("/cart/checkout")).send().await.unwrap();
    assert_eq!(location(&resp), Some("/auth/login"));
    assert!(cart_count(&ctx).await.contains(">1</span>"));
}

#[tokio::test]
async fn test_checkout_with_empty_cart_places_nothing() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(0)
        .mount(&ctx.api)
        .await;
    ctx.login(&client_claims()).await;

    let resp = ctx.client.post(ctx.url("/cart/checkout")).send().await.unwrap();
    assert_eq!(location(&resp), Some("/cart"));
}

#[tokio::test]
async fn test_checkout_posts_cart_and_empties_it() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .and(body_json(json!({"items": [
            {"product_id": 1, "quantity": 2},
            {"product_id": 2, "quantity": 1},
        ]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 42,
            "status": "PENDING",
            "total_amount": "250.00",
        })))
        .expect(1)
        .mount(&ctx.api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders/my-orders/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 42,
            "status": "PENDING",
            "total_amount": "250.00",
            "created_at": "2024-05-01T10:00:00Z",
            "items": [
                {"product_name": "Widget", "quantity": 2, "unit_price_applied": "100.00"},
                {"product_name": "Gadget", "quantity": 1, "unit_price_applied": "50.00"},
            ],
        }])))
        .mount(&ctx.api)
        .await;

    ctx.login(&client_claims()).await;
    ctx.add_to_cart(&widget()).await;
    ctx.add_to_cart(&gadget()).await;
    ctx.add_to_cart(&widget()).await;

    let resp = ctx.client.post(ctx.url("/cart/checkout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/orders?placed=42"));
    assert!(cart_count(&ctx).await.contains(">0</span>"));

    let (status, body) = ctx.page("/orders?placed=42").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Order #42 was placed."));
    assert!(body.contains("$250.00"));
    assert!(body.contains(r#"action="/orders/42/pay""#));
    assert!(!body.contains("/orders/42/invoice"));
}

#[tokio::test]
async fn test_rejected_order_keeps_cart() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"items": ["Insufficient stock"]})))
        .mount(&ctx.api)
        .await;
    ctx.login(&client_claims()).await;
    ctx.add_to_cart(&widget()).await;

    let resp = ctx.client.post(ctx.url("/cart/checkout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Your order could not be placed."));
    assert!(body.contains("Widget"));
    assert!(cart_count(&ctx).await.contains(">1</span>"));
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_invoice_download_and_payment_redirect() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/api/orders/7/invoice/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 invoice".to_vec()))
        .mount(&ctx.api)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/payments/checkout/"))
        .and(body_json(json!({"order_id": 7})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "init_point": "https://pay.example.com/checkout?pref=7",
        })))
        .mount(&ctx.api)
        .await;
    ctx.login(&client_claims()).await;

    let resp = ctx.client.get(ctx.url("/orders/7/invoice")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/pdf")
    );
    assert_eq!(
        resp.headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok()),
        Some(r#"attachment; filename="invoice-7.pdf""#)
    );
    assert!(resp.bytes().await.unwrap().starts_with(b"%PDF"));

    let resp = ctx.client.post(ctx.url("/orders/7/pay")).send().await.unwrap();
    assert_eq!(location(&resp), Some("https://pay.example.com/checkout?pref=7"));
}

#[tokio::test]
async fn test_failed_payment_returns_to_orders() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/checkout/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&ctx.api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders/my-orders/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&ctx.api)
        .await;
    ctx.login(&client_claims()).await;

    let resp = ctx.client.post(ctx.url("/orders/7/pay")).send().await.unwrap();
    assert_eq!(location(&resp), Some("/orders?error=payment"));

    let (_, body) = ctx.page("/orders?error=payment").await;
    assert!(body.contains("The payment could not be started."));
    assert!(body.contains("You have not placed any orders yet."));
}
