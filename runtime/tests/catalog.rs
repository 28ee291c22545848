//! Product lifecycle and its stock records.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use common::{counters, harness, order};
use std::sync::Arc;
use stockroom_core::{
    CustomerId, Money, NewProduct, ProductId, ReservationError, ReservationStatus,
    UpdateReservation, ValidationError,
};
use stockroom_runtime::CatalogService;
use stockroom_testing::InMemoryBackend;

fn catalog(backend: &InMemoryBackend) -> CatalogService {
    CatalogService::new(
        Arc::new(backend.stocks.clone()),
        Arc::new(backend.products.clone()),
    )
}

fn widget(quantity: u32) -> NewProduct {
    NewProduct {
        code: "W-1".to_string(),
        name: "Widget".to_string(),
        price: Money::from_cents(1_250),
        initial_quantity: quantity,
    }
}

#[tokio::test]
async fn created_product_gets_a_fresh_stock_record() {
    let backend = InMemoryBackend::new();
    let service = catalog(&backend);

    let product = service.create_product(widget(12)).await.unwrap();

    let level = service.stock_for(product.id).await.unwrap();
    assert_eq!((level.quantity, level.reserved, level.available), (12, 0, 12));
    assert_eq!(backend.stock_of(&product).id, product.stock);
}

#[tokio::test]
async fn negative_price_is_rejected_before_any_write() {
    let backend = InMemoryBackend::new();
    let mut request = widget(1);
    request.price = Money::from_cents(-1);

    let err = catalog(&backend).create_product(request).await.unwrap_err();

    assert_eq!(err, ValidationError::InvalidPrice { cents: -1 }.into());
    assert!(backend.stocks.all().is_empty());
    assert!(backend.products.is_empty());
}

#[tokio::test]
async fn deleting_a_product_deletes_its_stock() {
    let backend = InMemoryBackend::new();
    let service = catalog(&backend);
    let product = service.create_product(widget(3)).await.unwrap();

    service.delete_product(product.id).await.unwrap();

    assert!(backend.products.is_empty());
    assert!(backend.stocks.snapshot(product.stock).is_none());
    assert_eq!(
        service.stock_for(product.id).await.unwrap_err(),
        ReservationError::ProductNotFound(product.id)
    );
}

#[tokio::test]
async fn deleting_an_unknown_product_is_not_found() {
    let backend = InMemoryBackend::new();
    let id = ProductId::new();

    assert_eq!(
        catalog(&backend).delete_product(id).await.unwrap_err(),
        ReservationError::ProductNotFound(id)
    );
}

#[tokio::test]
async fn held_product_cannot_be_deleted() {
    let h = harness();
    let service = catalog(&h.backend);
    let a = h.backend.add_product("A", 100, 10);
    let view = h
        .service
        .create(order(CustomerId::new(), &[(&a, 4)]))
        .await
        .unwrap();

    assert_eq!(
        service.delete_product(a.id).await.unwrap_err(),
        ReservationError::ProductInUse {
            product: a.id,
            reserved: 4,
        }
    );
    assert_eq!(h.backend.products.len(), 1);

    h.service.cancel(view.reservation.id).await.unwrap();
    h.service.remove(view.reservation.id).await.unwrap();
    assert_eq!(counters(&h.backend, &a), (10, 0));
    service.delete_product(a.id).await.unwrap();
    assert!(h.backend.products.is_empty());
}

#[tokio::test]
async fn confirmed_reservation_outlives_its_product() {
    let h = harness();
    let service = catalog(&h.backend);
    let a = h.backend.add_product("A", 100, 10);
    let b = h.backend.add_product("B", 100, 10);
    let view = h
        .service
        .create(order(CustomerId::new(), &[(&a, 2), (&b, 3)]))
        .await
        .unwrap();
    let id = view.reservation.id;
    h.service.complete(id).await.unwrap();

    service.delete_product(a.id).await.unwrap();

    let moved = h
        .service
        .update(
            id,
            UpdateReservation {
                customer: Some(CustomerId::new()),
                ..UpdateReservation::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.reservation.status, ReservationStatus::Confirmed);

    let removed = h.service.remove(id).await.unwrap();
    assert_eq!(removed.details.len(), 2);
    assert_eq!(counters(&h.backend, &b), (10, 0));
    assert!(h.backend.reservations.is_empty());
}
