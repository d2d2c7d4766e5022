//! Integration tests for the wholesale REST API client.
//!
//! Run with: cargo test -p wholesale-integration-tests

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{
    body_json, body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wholesale_core::cart::{Cart, CartLine, ProductInput};
use rust_decimal::Decimal;
use wholesale_core::{OrderId, OrderStatus, Price, ProductId, UserId};
use wholesale_integration_tests::product_json;
use wholesale_storefront::api::{
    AdminListQuery, ApiClient, ApiError, Credentials, NewClient, NewOrder, ProductFilter,
    ProductUpdate, ReportKind,
};
use wholesale_storefront::config::ApiConfig;

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&ApiConfig::new(&server.uri()).expect("Invalid mock URL"))
        .expect("Failed to build API client")
}

fn token() -> SecretString {
    SecretString::from("access-token".to_string())
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_obtain_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(json!({"username": "norte", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "a", "refresh": "r"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tokens = client_for(&server)
        .obtain_token(&Credentials {
            username: "norte".to_string(),
            password: "secret".to_string(),
        })
        .await
        .expect("Token request failed");

    assert_eq!(tokens.access, "a");
    assert_eq!(tokens.refresh, "r");
}

#[tokio::test]
async fn test_401_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders/my-orders/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&server)
        .await;

    let err = client_for(&server).my_orders(&token()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized), "got {err:?}");
}

#[tokio::test]
async fn test_other_statuses_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/orders/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders/9/invoice/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(400).set_body_string("insufficient stock"))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client.admin_orders(&token(), None).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden), "got {err:?}");

    let err = client.invoice_pdf(&token(), OrderId::new(9)).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "got {err:?}");

    let err = client
        .create_order(&token(), &NewOrder { items: Vec::new() })
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "insufficient stock");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_category_tree_sends_bearer_and_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories/"))
        .and(header("authorization", "Bearer access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Motor", "slug": "motor", "children": [
                {"id": 2, "name": "Bujes", "slug": "bujes", "children": [], "product_count": 4}
            ]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.category_tree(&token()).await.expect("Tree request failed");
    let second = client.category_tree(&token()).await.expect("Cached tree failed");

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].children[0].slug, "bujes");
    assert_eq!(first[0].children[0].product_count, 4);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_invalidate_categories_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.category_tree(&token()).await.expect("Tree request failed");
    client.invalidate_categories().await;
    client.category_tree(&token()).await.expect("Tree request failed");
}

#[tokio::test]
async fn test_products_accept_paginated_page_and_send_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/"))
        .and(query_param("category", "bujes"))
        .and(query_param("min_price", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [product_json(1, "A1", "Widget", "100.00")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = ProductFilter {
        category: "bujes".to_string(),
        min_price: "10".to_string(),
        ..ProductFilter::default()
    };
    let products = client_for(&server)
        .list_products(&token(), &filter)
        .await
        .expect("Product request failed");

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].sku, "A1");
    assert_eq!(
        products[0].category_details.as_ref().map(|c| c.slug.as_str()),
        Some("bujes")
    );
}

#[tokio::test]
async fn test_products_accept_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            product_json(1, "A1", "Widget", "100.00"),
            product_json(2, "B2", "Gadget", "50.00"),
        ])))
        .mount(&server)
        .await;

    let products = client_for(&server)
        .list_products(&token(), &ProductFilter::default())
        .await
        .expect("Product request failed");

    let skus: Vec<&str> = products.iter().map(|p| p.sku.as_str()).collect();
    assert_eq!(skus, ["A1", "B2"]);
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_products(&token(), &ProductFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)), "got {err:?}");
}

// ============================================================================
// Orders & payments
// ============================================================================

#[tokio::test]
async fn test_create_order_posts_cart_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .and(header("authorization", "Bearer access-token"))
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
        .mount(&server)
        .await;

    let line = |id: i64, sku: &str, price: &str| {
        CartLine::try_from(ProductInput {
            id: ProductId::new(id),
            sku: sku.to_string(),
            name: sku.to_string(),
            base_price: price.to_string(),
        })
        .expect("Invalid product")
    };
    let mut cart = Cart::new();
    cart.add(&line(1, "A1", "100"));
    cart.add(&line(2, "B2", "50"));
    cart.add(&line(1, "A1", "100"));

    let created = client_for(&server)
        .create_order(&token(), &NewOrder { items: cart.order_lines() })
        .await
        .expect("Order request failed");
    assert_eq!(created.id, OrderId::new(42));
}

#[tokio::test]
async fn test_invoice_pdf_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders/5/invoice/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4 test".to_vec()),
        )
        .mount(&server)
        .await;

    let pdf = client_for(&server)
        .invoice_pdf(&token(), OrderId::new(5))
        .await
        .expect("Invoice request failed");
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_payment_checkout_returns_init_point() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/checkout/"))
        .and(body_json(json!({"order_id": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "init_point": "https://pay.example.com/checkout?pref=abc",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let init_point = client_for(&server)
        .payment_checkout(&token(), OrderId::new(5))
        .await
        .expect("Payment request failed");
    assert_eq!(init_point, "https://pay.example.com/checkout?pref=abc");
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn test_admin_orders_filter_and_status_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/orders/"))
        .and(query_param("status", "PAID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "status": "PAID",
            "total_amount": "80.00",
            "created_at": "2024-05-01T10:00:00Z",
            "items": [],
            "client_name": "Repuestos Norte",
            "client_email": "compras@norte.example",
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/admin/orders/3/"))
        .and(body_json(json!({"status": "SHIPPED"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "status": "SHIPPED"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let orders = client
        .admin_orders(&token(), Some(OrderStatus::Paid))
        .await
        .expect("Admin orders failed");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].client_name.as_deref(), Some("Repuestos Norte"));

    client
        .update_order_status(&token(), OrderId::new(3), OrderStatus::Shipped)
        .await
        .expect("Status update failed");
}

#[tokio::test]
async fn test_admin_categories_flat_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [
            {"id": 1, "name": "Motor", "slug": "motor", "parent": null, "product_count": 0},
            {"id": 2, "name": "Bujes", "slug": "bujes", "parent": 1, "product_count": 4},
        ]})))
        .mount(&server)
        .await;

    let flat = client_for(&server)
        .admin_categories(&token())
        .await
        .expect("Admin categories failed");
    assert_eq!(flat.len(), 2);
    assert_eq!(flat[1].parent.map(|id| id.as_i64()), Some(1));
}

#[tokio::test]
async fn test_admin_products_page_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/products/"))
        .and(query_param("page", "2"))
        .and(query_param("search", "buje"))
        .and(query_param("is_active", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 41,
            "next": "http://api.example/api/admin/products/?page=3",
            "previous": "http://api.example/api/admin/products/",
            "results": [{
                "id": 4, "sku": "BJ-1", "name": "Buje", "base_price": "12.50",
                "stock": 0, "is_active": false, "supplier": "Norte SA",
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server)
        .admin_products(
            &token(),
            &AdminListQuery {
                search: " buje ".to_string(),
                is_active: Some(false),
                page: 2,
            },
        )
        .await
        .expect("Admin products failed");
    assert_eq!(page.total, 41);
    assert!(page.has_next);
    assert_eq!(page.items.len(), 1);
    assert!(!page.items[0].is_active);
    assert_eq!(page.items[0].supplier.as_deref(), Some("Norte SA"));
}

#[tokio::test]
async fn test_first_admin_page_sends_no_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/products/"))
        .and(query_param_is_missing("page"))
        .and(query_param_is_missing("is_active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server)
        .admin_products(&token(), &AdminListQuery::default())
        .await
        .expect("Admin products failed");
    assert!(page.items.is_empty());
    assert!(!page.has_next);
}

#[tokio::test]
async fn test_update_product_sends_only_changed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/admin/products/4/"))
        .and(header("authorization", "Bearer access-token"))
        .and(body_json(json!({"is_active": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/admin/products/5/"))
        .and(body_json(json!({"name": "Buje largo", "base_price": "99.50", "stock": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .update_product(
            &token(),
            ProductId::new(4),
            &ProductUpdate {
                is_active: Some(false),
                ..ProductUpdate::default()
            },
        )
        .await
        .expect("Visibility change failed");
    client
        .update_product(
            &token(),
            ProductId::new(5),
            &ProductUpdate {
                name: Some("Buje largo".to_string()),
                base_price: Some(Price::parse("99.50").unwrap()),
                stock: Some(3),
                ..ProductUpdate::default()
            },
        )
        .await
        .expect("Product edit failed");
}

#[tokio::test]
async fn test_update_product_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/admin/products/4/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"base_price": ["Invalid"]})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .update_product(&token(), ProductId::new(4), &ProductUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }), "got {err:?}");
}

#[tokio::test]
async fn test_import_products_uploads_file_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/products/import/"))
        .and(body_string_contains(r#"name="file""#))
        .and(body_string_contains(r#"filename="precios.xlsx""#))
        .and(body_string_contains("PK-sheet-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "created": 2,
            "updated": 5,
            "log": ["Row 3: new SKU BJ-9"],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = client_for(&server)
        .import_products(&token(), "precios.xlsx", b"PK-sheet-bytes".to_vec())
        .await
        .expect("Import failed");
    assert!(summary.success);
    assert_eq!((summary.created, summary.updated), (2, 5));
    assert_eq!(summary.log, ["Row 3: new SKU BJ-9"]);
}

#[tokio::test]
async fn test_rejected_import_returns_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/products/import/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "error": "Missing column: sku",
            "log": [],
        })))
        .mount(&server)
        .await;

    let summary = client_for(&server)
        .import_products(&token(), "precios.xlsx", b"PK".to_vec())
        .await
        .expect("A rejected sheet is not an error");
    assert!(!summary.success);
    assert_eq!(summary.error.as_deref(), Some("Missing column: sku"));
}

#[tokio::test]
async fn test_import_400_without_summary_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/products/import/"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .import_products(&token(), "precios.xlsx", b"PK".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }), "got {err:?}");
}

#[tokio::test]
async fn test_admin_clients_create_toggle_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/users/"))
        .and(query_param("search", "norte"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 1, "next": null, "results": [{
            "id": 7, "username": "norte", "company_name": "Repuestos Norte",
            "discount_rate": "0.10", "province": null, "is_active": true,
        }]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/users/"))
        .and(body_json(json!({
            "client_number": null,
            "company_name": "Frenos Sur",
            "contact_name": "Ana",
            "email": "ana@sur.example",
            "phone": "",
            "province": "Cordoba",
            "tax_id": "",
            "discount_rate": "0.05",
            "password": "s3cret",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 8, "username": "ana@sur.example", "company_name": "Frenos Sur",
            "discount_rate": "0.05",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/admin/users/7/"))
        .and(body_json(json!({"is_active": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/admin/users/7/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let page = client
        .admin_clients(
            &token(),
            &AdminListQuery {
                search: "norte".to_string(),
                ..AdminListQuery::default()
            },
        )
        .await
        .expect("Client list failed");
    assert_eq!(page.total, 1);
    assert!(!page.has_next);
    assert_eq!(page.items[0].discount_rate, Decimal::new(10, 2));
    assert!(page.items[0].province.is_none());

    let created = client
        .create_client(
            &token(),
            &NewClient {
                client_number: None,
                company_name: "Frenos Sur".to_string(),
                contact_name: "Ana".to_string(),
                email: "ana@sur.example".to_string(),
                phone: String::new(),
                province: "Cordoba".to_string(),
                tax_id: String::new(),
                discount_rate: Decimal::new(5, 2),
                password: "s3cret".to_string(),
            },
        )
        .await
        .expect("Create client failed");
    assert_eq!(created.id, UserId::new(8));
    assert!(created.is_active);

    client
        .set_client_active(&token(), UserId::new(7), false)
        .await
        .expect("Deactivate failed");
    client
        .delete_client(&token(), UserId::new(7))
        .await
        .expect("Delete failed");
}

#[tokio::test]
async fn test_export_report_passes_bytes_and_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/export/orders/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-type",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                )
                .insert_header("content-disposition", r#"attachment; filename="orders.xlsx""#)
                .set_body_bytes(b"PK\x03\x04orders".to_vec()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/export/products/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let download = client
        .export_report(&token(), ReportKind::Orders)
        .await
        .expect("Export failed");
    assert!(download.bytes.starts_with(b"PK"));
    assert_eq!(
        download.content_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let err = client
        .export_report(&token(), ReportKind::Products)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "got {err:?}");
}
