//! A failed request leaves stock as it found it.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use common::{counters, harness, order};
use stockroom_core::{
    CustomerId, LineUpdate, ReservationError, ReservationStatus, StoreError, UpdateReservation,
};

#[tokio::test]
async fn insufficient_second_product_releases_the_first() {
    let h = harness();
    let a = h.backend.add_product("A", 100, 10);
    let b = h.backend.add_product("B", 100, 1);

    let err = h
        .service
        .create(order(CustomerId::new(), &[(&a, 4), (&b, 2)]))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::InsufficientStock { product, available: 1, .. } if product == b.id));
    assert_eq!(counters(&h.backend, &a), (10, 0));
    assert_eq!(counters(&h.backend, &b), (1, 0));
    assert!(h.backend.reservations.is_empty());
    assert!(h.backend.details.is_empty());
}

#[tokio::test]
async fn failed_line_write_on_create_releases_holds() {
    let h = harness();
    let a = h.backend.add_product("A", 100, 10);
    h.backend.details.fail_writes(true);

    let err = h
        .service
        .create(order(CustomerId::new(), &[(&a, 3)]))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::Store(StoreError::Database(_))));
    assert!(err.is_retryable());
    assert_eq!(counters(&h.backend, &a), (10, 0));
    assert!(h.backend.reservations.is_empty());
}

#[tokio::test]
async fn failed_line_write_on_update_unwinds_deltas_and_transition() {
    let h = harness();
    let a = h.backend.add_product("A", 100, 10);
    let b = h.backend.add_product("B", 100, 10);
    let view = h
        .service
        .create(order(CustomerId::new(), &[(&a, 2), (&b, 2)]))
        .await
        .unwrap();
    h.backend.details.fail_writes(true);

    let err = h
        .service
        .update(
            view.reservation.id,
            UpdateReservation {
                lines: Some(vec![LineUpdate::new(a.id, 5)]),
                status: Some(ReservationStatus::Confirmed),
                customer: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::Store(_)));
    assert_eq!(counters(&h.backend, &a), (10, 2));
    assert_eq!(counters(&h.backend, &b), (10, 2));

    h.backend.details.fail_writes(false);
    let stored = h.service.get(view.reservation.id).await.unwrap();
    assert_eq!(stored.reservation.status, ReservationStatus::Pending);
    assert_eq!(stored, view);
}

#[tokio::test]
async fn failed_confirmation_unwinds_earlier_confirmations() {
    // Stock for B loses its hold behind the service's back; confirming must
    // fail and A's confirmation must be undone.
    let h = harness();
    let a = h.backend.add_product("A", 100, 10);
    let b = h.backend.add_product("B", 100, 10);
    let view = h
        .service
        .create(order(CustomerId::new(), &[(&a, 3), (&b, 3)]))
        .await
        .unwrap();
    let mut corrupted = h.backend.stock_of(&b);
    corrupted.reserved = 1;
    h.backend.stocks.insert(corrupted);

    let err = h.service.complete(view.reservation.id).await.unwrap_err();

    assert_eq!(
        err,
        ReservationError::InsufficientHold {
            stock: b.stock,
            requested: 3,
            held: 1,
        }
    );
    assert!(err.is_invariant_violation());
    assert_eq!(counters(&h.backend, &a), (10, 3));
    assert_eq!(counters(&h.backend, &b), (10, 1));
    let stored = h.service.get(view.reservation.id).await.unwrap();
    assert_eq!(stored.reservation.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn failed_removal_restores_holds_and_can_be_retried() {
    let h = harness();
    let a = h.backend.add_product("A", 100, 10);
    let target = h
        .service
        .create(order(CustomerId::new(), &[(&a, 4)]))
        .await
        .unwrap();
    h.service
        .create(order(CustomerId::new(), &[(&a, 4)]))
        .await
        .unwrap();
    h.backend.details.fail_writes(true);

    let err = h.service.remove(target.reservation.id).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(counters(&h.backend, &a), (10, 8));
    assert_eq!(h.backend.reservations.len(), 2);

    h.backend.details.fail_writes(false);
    h.service.remove(target.reservation.id).await.unwrap();
    assert_eq!(counters(&h.backend, &a), (10, 4));
    assert_eq!(h.backend.reservations.len(), 1);
}

#[tokio::test]
async fn failed_removal_of_confirmed_reservation_takes_back_the_restock() {
    let h = harness();
    let a = h.backend.add_product("A", 100, 10);
    let view = h
        .service
        .create(order(CustomerId::new(), &[(&a, 3)]))
        .await
        .unwrap();
    h.service.complete(view.reservation.id).await.unwrap();
    h.backend.details.fail_writes(true);

    h.service.remove(view.reservation.id).await.unwrap_err();
    assert_eq!(counters(&h.backend, &a), (7, 0));

    h.backend.details.fail_writes(false);
    h.service.remove(view.reservation.id).await.unwrap();
    assert_eq!(counters(&h.backend, &a), (10, 0));
}
