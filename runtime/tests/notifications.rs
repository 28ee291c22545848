//! Best-effort notification on create.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use common::{counters, harness, order, service_for};
use std::sync::Arc;
use std::time::Duration;
use stockroom_core::{CustomerId, NotifyError, ReservationStatus};
use stockroom_runtime::{Delivery, NotificationDispatcher, RetryPolicy};
use stockroom_testing::{FailingNotifier, InMemoryBackend, RecordingNotifier};

#[tokio::test]
async fn created_event_carries_customer_name() {
    let h = harness();
    let a = h.backend.add_product("A", 100, 10);
    let customer = CustomerId::new();
    h.backend.customers.insert(customer, "Ada Lovelace");

    let view = h.service.create(order(customer, &[(&a, 1)])).await.unwrap();

    assert!(h.notifier.wait_for(1, Duration::from_secs(2)).await);
    let events = h.notifier.events();
    assert_eq!(events[0].reservation_id, view.reservation.id);
    assert_eq!(events[0].customer_id, customer);
    assert_eq!(events[0].customer_name.as_deref(), Some("Ada Lovelace"));
}

#[tokio::test]
async fn unknown_customer_is_notified_without_name() {
    let h = harness();
    let a = h.backend.add_product("A", 100, 10);

    h.service.create(order(CustomerId::new(), &[(&a, 1)])).await.unwrap();

    assert!(h.notifier.wait_for(1, Duration::from_secs(2)).await);
    assert_eq!(h.notifier.events()[0].customer_name, None);
}

#[tokio::test]
async fn failed_creation_sends_nothing() {
    let h = harness();
    let a = h.backend.add_product("A", 100, 1);

    assert!(h.service.create(order(CustomerId::new(), &[(&a, 5)])).await.is_err());

    assert!(!h.notifier.wait_for(1, Duration::from_millis(50)).await);
}

#[tokio::test]
async fn delivery_failure_never_fails_creation() {
    let backend = InMemoryBackend::new();
    let notifier = FailingNotifier::transient();
    let service = service_for(&backend, Arc::new(notifier.clone()));
    let a = backend.add_product("A", 100, 10);

    let view = service.create(order(CustomerId::new(), &[(&a, 2)])).await.unwrap();

    assert_eq!(view.reservation.status, ReservationStatus::Pending);
    assert_eq!(counters(&backend, &a), (10, 2));
}

#[tokio::test]
async fn transient_failures_are_retried_then_dropped() {
    let backend = InMemoryBackend::new();
    let notifier = FailingNotifier::transient();
    let dispatcher = NotificationDispatcher::new(
        Arc::new(notifier.clone()),
        Arc::new(backend.customers.clone()),
    )
    .with_policy(
        RetryPolicy::builder()
            .max_retries(3)
            .initial_delay(Duration::from_millis(1))
            .build(),
    );

    let outcome = dispatcher
        .dispatch(stockroom_core::ReservationId::new(), CustomerId::new())
        .await
        .unwrap();

    assert_eq!(outcome, Delivery::Failed);
    assert_eq!(notifier.attempts(), 4);
}

#[tokio::test]
async fn permanent_rejection_is_not_retried() {
    let backend = InMemoryBackend::new();
    let notifier = FailingNotifier::with_error(NotifyError::Rejected { status: 422 });
    let dispatcher = NotificationDispatcher::new(
        Arc::new(notifier.clone()),
        Arc::new(backend.customers.clone()),
    );

    let outcome = dispatcher
        .dispatch(stockroom_core::ReservationId::new(), CustomerId::new())
        .await
        .unwrap();

    assert_eq!(outcome, Delivery::Failed);
    assert_eq!(notifier.attempts(), 1);
}

#[tokio::test]
async fn successful_dispatch_reports_delivered() {
    let backend = InMemoryBackend::new();
    let notifier = RecordingNotifier::new();
    let dispatcher =
        NotificationDispatcher::new(Arc::new(notifier.clone()), Arc::new(backend.customers.clone()));

    let outcome = dispatcher
        .dispatch(stockroom_core::ReservationId::new(), CustomerId::new())
        .await
        .unwrap();

    assert_eq!(outcome, Delivery::Delivered);
    assert_eq!(notifier.events().len(), 1);
}
