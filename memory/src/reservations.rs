//! Reservation aggregates and their lines.

use crate::{read, write};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use stockroom_core::store::{DetailStore, ReservationStore, ReservationWrite, StoreFuture};
use stockroom_core::{
    DetailId, Page, Reservation, ReservationDetail, ReservationFilter, ReservationId, StoreError,
};
use tokio::task::yield_now;

/// In-memory reservation line store.
///
/// [`InMemoryDetailStore::fail_writes`] makes every subsequent line write
/// fail, including the line writes of an [`InMemoryReservationStore`]
/// sharing this store.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDetailStore {
    details: Arc<RwLock<HashMap<DetailId, ReservationDetail>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryDetailStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle write failure injection
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored lines
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.details).len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read(&self.details).is_empty()
    }

    /// Check if a line exists
    #[must_use]
    pub fn contains(&self, id: DetailId) -> bool {
        read(&self.details).contains_key(&id)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Database("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DetailStore for InMemoryDetailStore {
    fn insert_many(&self, details: Vec<ReservationDetail>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_writable()?;
            let mut store = write(&self.details);
            for detail in details {
                store.insert(detail.id, detail);
            }
            Ok(())
        })
    }

    fn get_many(&self, ids: Vec<DetailId>) -> StoreFuture<'_, Vec<ReservationDetail>> {
        Box::pin(async move {
            let store = read(&self.details);
            Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
        })
    }

    fn update(&self, detail: ReservationDetail) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_writable()?;
            match write(&self.details).get_mut(&detail.id) {
                Some(existing) => {
                    *existing = detail;
                    Ok(())
                }
                None => Err(StoreError::NotFound(format!("reservation detail {}", detail.id))),
            }
        })
    }

    fn delete_many(&self, ids: Vec<DetailId>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_writable()?;
            let mut store = write(&self.details);
            for id in ids {
                store.remove(&id);
            }
            Ok(())
        })
    }
}

/// In-memory reservation store.
///
/// Listing is newest first: by `created_at`, then by insertion order.
/// Conditional saves and deletes hold the reservation lock and then the line
/// lock, so a version check and the writes it guards are one step.
#[derive(Clone, Debug, Default)]
pub struct InMemoryReservationStore {
    reservations: Arc<RwLock<HashMap<ReservationId, (u64, Reservation)>>>,
    sequence: Arc<AtomicU64>,
    details: InMemoryDetailStore,
}

impl InMemoryReservationStore {
    /// Create an empty store with a private line store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store writing lines into `details`
    #[must_use]
    pub fn with_details(details: InMemoryDetailStore) -> Self {
        Self {
            details,
            ..Self::default()
        }
    }

    /// Number of stored reservations
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.reservations).len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read(&self.reservations).is_empty()
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
            write(&self.reservations).insert(reservation.id, (seq, reservation));
            Ok(())
        })
    }

    fn get(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(async move {
            yield_now().await;
            Ok(read(&self.reservations).get(&id).map(|(_, r)| r.clone()))
        })
    }

    fn save(&self, change: ReservationWrite) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            yield_now().await;
            self.details.check_writable()?;

            let mut reservations = write(&self.reservations);
            let Some((_, stored)) = reservations.get_mut(&change.reservation.id) else {
                return Ok(false);
            };
            if stored.version != change.expected_version {
                return Ok(false);
            }

            let mut lines = write(&self.details.details);
            if let Some(missing) = change.update.iter().find(|d| !lines.contains_key(&d.id)) {
                return Err(StoreError::NotFound(format!("reservation detail {}", missing.id)));
            }
            for id in &change.delete {
                lines.remove(id);
            }
            for detail in change.update {
                lines.insert(detail.id, detail);
            }
            for detail in change.insert {
                lines.insert(detail.id, detail);
            }
            *stored = change.reservation;
            Ok(true)
        })
    }

    fn delete(&self, id: ReservationId, expected_version: u64) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            yield_now().await;
            self.details.check_writable()?;

            let mut reservations = write(&self.reservations);
            match reservations.get(&id) {
                Some((_, stored)) if stored.version == expected_version => {}
                _ => return Ok(false),
            }
            if let Some((_, removed)) = reservations.remove(&id) {
                let mut lines = write(&self.details.details);
                for detail in &removed.details {
                    lines.remove(detail);
                }
            }
            Ok(true)
        })
    }

    fn list(
        &self,
        filter: ReservationFilter,
        page: Option<Page>,
    ) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let store = read(&self.reservations);
            let mut matching: Vec<&(u64, Reservation)> = store
                .values()
                .filter(|(_, r)| filter.customer.is_none_or(|c| c == r.customer))
                .filter(|(_, r)| filter.status.is_none_or(|s| s == r.status))
                .collect();
            matching.sort_by(|(seq_a, a), (seq_b, b)| {
                b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
            });

            let (skip, take) = page.map_or((0, usize::MAX), |p| {
                (
                    usize::try_from(p.offset()).unwrap_or(usize::MAX),
                    p.limit() as usize,
                )
            });
            Ok(matching
                .into_iter()
                .skip(skip)
                .take(take)
                .map(|(_, r)| r.clone())
                .collect())
        })
    }
}
