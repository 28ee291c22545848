//! Router tests driving the full HTTP surface against in-memory stores.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use stockroom_core::CustomerId;
use stockroom_runtime::RetryPolicy;
use stockroom_testing::{RecordingNotifier, test_clock};
use stockroom_web::{Backends, REQUEST_ID_HEADER, build_router};
use tower::ServiceExt;

fn app() -> Router {
    stockroom_testing::init_test_tracing();
    let state = Backends::memory().into_state(
        Arc::new(RecordingNotifier::new()),
        RetryPolicy::no_retry(),
        Arc::new(test_clock()),
    );
    build_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Creates a product and returns its id.
async fn product(app: &Router, code: &str, price: i64, quantity: u32) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/products",
        Some(json!({
            "code": code,
            "name": format!("Product {code}"),
            "price": price,
            "initialQuantity": quantity,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn stock(app: &Router, product: &str) -> (u64, u64, u64) {
    let (status, body) = send(app, Method::GET, &format!("/products/{product}/stock"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        body["quantity"].as_u64().unwrap(),
        body["reserved"].as_u64().unwrap(),
        body["available"].as_u64().unwrap(),
    )
}

async fn reserve(app: &Router, user: &str, lines: Value) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/reservations",
        Some(json!({ "user": user, "reservationDetail": lines })),
    )
    .await
}

#[tokio::test]
async fn health_reports_ok_with_request_id() {
    let app = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn create_holds_stock_and_returns_lines() {
    let app = app();
    let p = product(&app, "P", 10, 10).await;
    let user = CustomerId::new().to_string();

    let (status, body) = reserve(&app, &user, json!([{ "product": p, "quantity": 3 }])).await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["total"], 30);
    assert_eq!(body["customer"], user);
    let lines = body["reservation_detail"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product"], p);
    assert_eq!(lines[0]["quantity"], 3);
    assert_eq!(lines[0]["subtotal"], 30);
    assert_eq!(stock(&app, &p).await, (10, 3, 7));
}

#[tokio::test]
async fn insufficient_stock_is_a_conflict_naming_the_product() {
    let app = app();
    let p = product(&app, "SCARCE", 10, 2).await;

    let (status, body) = reserve(
        &app,
        &CustomerId::new().to_string(),
        json!([{ "product": p, "quantity": 5 }]),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Product SCARCE"), "{message}");
    assert!(message.contains("available 2"), "{message}");
    assert_eq!(stock(&app, &p).await, (2, 0, 2));
}

#[tokio::test]
async fn boundary_validation_errors_are_400() {
    let app = app();
    let p = product(&app, "P", 10, 10).await;
    let user = CustomerId::new().to_string();

    let cases = [
        ("/reservations", json!({ "user": "nope", "reservationDetail": [{ "product": p, "quantity": 1 }] })),
        ("/reservations", json!({ "user": user, "reservationDetail": [] })),
        ("/reservations", json!({ "user": user, "reservationDetail": [{ "product": p, "quantity": 0 }] })),
        ("/reservations", json!({ "user": user, "reservationDetail": [{ "product": "x", "quantity": 1 }] })),
        ("/reservations", json!({ "reservationDetail": [] })),
    ];
    for (uri, body) in cases {
        let (status, response) = send(&app, Method::POST, uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body} -> {response}");
        assert_eq!(response["code"], "VALIDATION_ERROR");
    }

    let (status, _) = send(&app, Method::GET, "/reservations/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::GET, "/reservations?status=shipped", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::GET, "/reservations/user/123", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stock(&app, &p).await, (10, 0, 10));
}

#[tokio::test]
async fn unknown_records_are_404() {
    let app = app();
    let missing = uuid_string();

    let (status, body) = send(&app, Method::GET, &format!("/reservations/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = reserve(
        &app,
        &CustomerId::new().to_string(),
        json!([{ "product": missing, "quantity": 1 }]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &format!("/products/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_edits_lines_then_complete_deducts() {
    let app = app();
    let a = product(&app, "A", 1_000, 10).await;
    let b = product(&app, "B", 500, 10).await;
    let c = product(&app, "C", 250, 10).await;
    let (_, created) = reserve(
        &app,
        &CustomerId::new().to_string(),
        json!([{ "product": a, "quantity": 2 }, { "product": b, "quantity": 1 }]),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, edited) = send(
        &app,
        Method::PATCH,
        &format!("/reservations/{id}"),
        Some(json!({
            "reservationDetail": [{ "product": a, "quantity": 5 }, { "product": c, "quantity": 1 }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{edited}");
    assert_eq!(edited["total"], 5_250);
    assert_eq!(stock(&app, &a).await, (10, 5, 5));
    assert_eq!(stock(&app, &b).await, (10, 0, 10));
    assert_eq!(stock(&app, &c).await, (10, 1, 9));

    let (status, confirmed) =
        send(&app, Method::POST, &format!("/reservations/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "CONFIRMED");
    assert_eq!(stock(&app, &a).await, (5, 0, 5));
    assert_eq!(stock(&app, &c).await, (9, 0, 9));

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/reservations/{id}"),
        Some(json!({ "reservationDetail": [{ "product": a, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn cancel_then_delete_restores_stock() {
    let app = app();
    let p = product(&app, "P", 10, 20).await;
    let (_, created) = reserve(
        &app,
        &CustomerId::new().to_string(),
        json!([{ "product": p, "quantity": 4 }]),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, cancelled) =
        send(&app, Method::POST, &format!("/reservations/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(stock(&app, &p).await, (20, 0, 20));

    let (status, _) = send(&app, Method::DELETE, &format!("/reservations/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/reservations/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(stock(&app, &p).await, (20, 0, 20));
}

#[tokio::test]
async fn held_products_cannot_be_deleted() {
    let app = app();
    let p = product(&app, "P", 10, 5).await;
    let (_, created) = reserve(
        &app,
        &CustomerId::new().to_string(),
        json!([{ "product": p, "quantity": 2 }]),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(&app, Method::DELETE, &format!("/products/{p}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PRODUCT_IN_USE");
    assert_eq!(stock(&app, &p).await, (5, 2, 3));

    send(&app, Method::POST, &format!("/reservations/{id}/cancel"), None).await;
    let (status, _) = send(&app, Method::DELETE, &format!("/products/{p}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn deleting_a_confirmed_reservation_restocks() {
    let app = app();
    let p = product(&app, "P", 10, 20).await;
    let (_, created) = reserve(
        &app,
        &CustomerId::new().to_string(),
        json!([{ "product": p, "quantity": 4 }]),
    )
    .await;
    let id = created["id"].as_str().unwrap();
    send(&app, Method::POST, &format!("/reservations/{id}/complete"), None).await;
    assert_eq!(stock(&app, &p).await, (16, 0, 16));

    let (status, _) = send(&app, Method::DELETE, &format!("/reservations/{id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock(&app, &p).await, (20, 0, 20));
}

#[tokio::test]
async fn listings_filter_by_customer_status_and_page() {
    let app = app();
    let p = product(&app, "P", 10, 100).await;
    let user = CustomerId::new().to_string();
    let mut mine = Vec::new();
    for _ in 0..3 {
        let (_, body) = reserve(&app, &user, json!([{ "product": p, "quantity": 1 }])).await;
        mine.push(body["id"].as_str().unwrap().to_string());
    }
    reserve(
        &app,
        &CustomerId::new().to_string(),
        json!([{ "product": p, "quantity": 1 }]),
    )
    .await;
    send(&app, Method::POST, &format!("/reservations/{}/cancel", mine[0]), None).await;

    let (status, body) = send(&app, Method::GET, &format!("/reservations/user/{user}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/reservations/user/{user}?status=PENDING"),
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/reservations?status=", None).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (_, body) = send(&app, Method::GET, "/reservations?page=2&limit=3", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, Method::GET, "/reservations?limit=0", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/reservations?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/reservations")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn uuid_string() -> String {
    stockroom_core::ReservationId::new().to_string()
}
