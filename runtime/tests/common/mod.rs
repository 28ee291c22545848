//! Shared fixtures for runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use stockroom_core::store::Notifier;
use stockroom_core::{CreateReservation, CustomerId, LineItem, Product};
use stockroom_runtime::{
    NotificationDispatcher, ReservationEnvironment, ReservationService, RetryPolicy,
};
use stockroom_testing::{InMemoryBackend, RecordingNotifier};

pub struct Harness {
    pub backend: InMemoryBackend,
    pub service: ReservationService,
    pub notifier: RecordingNotifier,
}

pub fn harness() -> Harness {
    stockroom_testing::init_test_tracing();
    let notifier = RecordingNotifier::new();
    let backend = InMemoryBackend::new();
    let service = service_for(&backend, Arc::new(notifier.clone()));
    Harness {
        backend,
        service,
        notifier,
    }
}

pub fn service_for(backend: &InMemoryBackend, notifier: Arc<dyn Notifier>) -> ReservationService {
    let env = ReservationEnvironment::new(
        Arc::new(backend.stocks.clone()),
        Arc::new(backend.products.clone()),
        Arc::new(backend.details.clone()),
        Arc::new(backend.reservations.clone()),
        Arc::new(backend.clock.clone()),
    );
    let dispatcher = NotificationDispatcher::new(notifier, Arc::new(backend.customers.clone()))
        .with_policy(
            RetryPolicy::builder()
                .max_retries(3)
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(5))
                .build(),
        );
    ReservationService::new(env, dispatcher)
}

pub fn order(customer: CustomerId, lines: &[(&Product, u32)]) -> CreateReservation {
    CreateReservation {
        customer,
        lines: lines
            .iter()
            .map(|(p, q)| LineItem::new(p.id, *q))
            .collect(),
    }
}

/// `(quantity, reserved)` of a product's stock.
pub fn counters(backend: &InMemoryBackend, product: &Product) -> (u32, u32) {
    let s = backend.stock_of(product);
    (s.quantity, s.reserved)
}
