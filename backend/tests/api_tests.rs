//! HTTP API tests
//!
//! Drive the full router over the in-memory store

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{Harness, JWT_SECRET};
use reseller_ledger_backend::config::Config;
use reseller_ledger_backend::{create_app, AppState};

fn app() -> Router {
    let harness = Harness::new();
    create_app(AppState::new(harness.shared(), Config::in_memory(JWT_SECRET)))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn sign_up(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "name": "Back Office",
            "email": "office@example.com",
            "password": "s3cret-pass"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["access_token"].as_str().unwrap().to_string()
}

/// Create a reseller and a product, returning their ids
async fn catalog(app: &Router, token: &str, stock: i32) -> (String, String) {
    let (status, reseller) = send(
        app,
        Method::POST,
        "/api/v1/resellers",
        Some(token),
        Some(json!({
            "name": "Toko Sinar",
            "email": "sinar@example.com",
            "phone": "081234567890"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, product) = send(
        app,
        Method::POST,
        "/api/v1/products",
        Some(token),
        Some(json!({
            "name": "Face Serum",
            "sku": "SER-001",
            "price": "10.00",
            "current_stock": stock
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        reseller["id"].as_str().unwrap().to_string(),
        product["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "memory (connected)");
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/dashboard",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_profile() {
    let app = app();
    sign_up(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "office@example.com", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "office@example.com", "password": "s3cret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/v1/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "office@example.com");
}

#[tokio::test]
async fn test_order_to_dashboard_flow() {
    let app = app();
    let token = sign_up(&app).await;
    let (reseller_id, product_id) = catalog(&app, &token, 10).await;

    let (status, order) = send(
        &app,
        Method::POST,
        "/api/v1/orders",
        Some(&token),
        Some(json!({
            "reseller_id": reseller_id,
            "items": [{ "product_id": product_id, "quantity": 3 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total_amount"], "30.00");
    assert_eq!(order["payment_status"], "unpaid");
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, receipt) = send(
        &app,
        Method::POST,
        &format!("/api/v1/payments/order/{}/pay", order_id),
        Some(&token),
        Some(json!({ "amount": "30.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["payment"]["status"], "paid");
    assert_eq!(receipt["transaction"]["type"], "CASH_IN");
    assert_eq!(receipt["transaction"]["category"], "PAYMENT");

    let (status, dashboard) = send(&app, Method::GET, "/api/v1/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["current_balance"], "30.00");
    assert_eq!(dashboard["today_cash_in"], "30.00");
    assert_eq!(dashboard["recent_transactions"].as_array().unwrap().len(), 1);
    assert!(dashboard["unpaid_orders"].as_array().unwrap().is_empty());

    let (status, product) = send(
        &app,
        Method::GET,
        &format!("/api/v1/products/{}", product_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["current_stock"], 7);
}

#[tokio::test]
async fn test_cancel_twice_conflicts() {
    let app = app();
    let token = sign_up(&app).await;
    let (reseller_id, product_id) = catalog(&app, &token, 10).await;

    let (_, order) = send(
        &app,
        Method::POST,
        "/api/v1/orders",
        Some(&token),
        Some(json!({
            "reseller_id": reseller_id,
            "items": [{ "product_id": product_id, "quantity": 2 }]
        })),
    )
    .await;
    let uri = format!("/api/v1/orders/{}/cancel", order["id"].as_str().unwrap());

    let (status, cancelled) = send(&app, Method::PATCH, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_CANCELLED");
}

#[tokio::test]
async fn test_insufficient_stock_is_unprocessable() {
    let app = app();
    let token = sign_up(&app).await;
    let (reseller_id, product_id) = catalog(&app, &token, 5).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/orders",
        Some(&token),
        Some(json!({
            "reseller_id": reseller_id,
            "items": [{ "product_id": product_id, "quantity": 6 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn test_cash_out_and_export() {
    let app = app();
    let token = sign_up(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/transactions/cash-out",
        Some(&token),
        Some(json!({ "category": "RENT", "amount": "10.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, entry) = send(
        &app,
        Method::POST,
        "/api/v1/transactions/cash-in",
        Some(&token),
        Some(json!({ "amount": "25.00", "description": "Owner top-up" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["current_balance"], "25.00");

    let request = Request::builder()
        .uri("/api/v1/transactions/export")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/csv"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.contains("CASH_IN,OTHER,25.00,Owner top-up"));
}
