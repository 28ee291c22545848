//! Reservation service.
//!
//! Coordinates the pure diff engine, the stock ledger and the stores:
//!
//! ```text
//! create:  validate → load products → hold per product → write lines → write aggregate → notify
//! update:  load → validate → diff → releases → holds → transition → conditional save
//! remove:  load → status-dependent reversal → conditional delete
//! ```
//!
//! Every ledger write goes through a [`LedgerJournal`]; when a later step
//! fails, the journal is unwound so the request leaves stock exactly as it
//! found it.
//!
//! Updates and removals are conditional on the version that was loaded. Of
//! two requests racing on one reservation, the one whose save lands second
//! unwinds its ledger writes and fails with [`ReservationError::Conflict`].

use crate::ledger::{Ledger, LedgerJournal};
use crate::metrics::ReservationMetrics;
use crate::notify::NotificationDispatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use stockroom_core::diff::{StockDeltas, aggregate_quantities, plan_line_changes};
use stockroom_core::environment::Clock;
use stockroom_core::store::{
    DetailStore, ProductCatalog, ReservationStore, ReservationWrite, StockLedger,
};
use stockroom_core::validation::{self, ValidationError};
use stockroom_core::{
    CreateReservation, CustomerId, DetailId, LineUpdate, Money, Page, Product, ProductId,
    Reservation, ReservationDetail, ReservationError, ReservationFilter, ReservationId,
    ReservationStatus, ReservationView, StockEffect, UpdateReservation,
};

/// Stores and collaborators used by [`ReservationService`].
#[derive(Clone)]
pub struct ReservationEnvironment {
    /// Stock counters
    pub stocks: Arc<dyn StockLedger>,
    /// Product lookups
    pub products: Arc<dyn ProductCatalog>,
    /// Reservation lines
    pub details: Arc<dyn DetailStore>,
    /// Reservation aggregates
    pub reservations: Arc<dyn ReservationStore>,
    /// Timestamp source
    pub clock: Arc<dyn Clock>,
}

impl ReservationEnvironment {
    /// Creates a new environment.
    #[must_use]
    pub fn new(
        stocks: Arc<dyn StockLedger>,
        products: Arc<dyn ProductCatalog>,
        details: Arc<dyn DetailStore>,
        reservations: Arc<dyn ReservationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stocks,
            products,
            details,
            reservations,
            clock,
        }
    }
}

/// Reservation lifecycle operations.
#[derive(Clone)]
pub struct ReservationService {
    env: ReservationEnvironment,
    ledger: Ledger,
    notifications: NotificationDispatcher,
}

impl ReservationService {
    /// Creates the service.
    #[must_use]
    pub fn new(env: ReservationEnvironment, notifications: NotificationDispatcher) -> Self {
        let ledger = Ledger::new(Arc::clone(&env.stocks));
        Self {
            env,
            ledger,
            notifications,
        }
    }

    /// The guarded stock ledger used by this service.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Creates a `PENDING` reservation, holding stock for every line.
    ///
    /// Holds are taken one product at a time; the first product that cannot
    /// be held aborts the request and every hold already taken is released.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::Validation`] for an empty list or zero quantity
    /// - [`ReservationError::ProductNotFound`] for an unknown product
    /// - [`ReservationError::InsufficientStock`] naming the product and its
    ///   availability
    /// - [`ReservationError::Store`] on persistence failure
    #[tracing::instrument(skip(self, request), fields(customer = %request.customer, lines = request.lines.len()))]
    pub async fn create(&self, request: CreateReservation) -> Result<ReservationView, ReservationError> {
        let started = Instant::now();
        let result = self.create_inner(request).await;
        ReservationMetrics::record("create", started, &result);
        result
    }

    async fn create_inner(&self, request: CreateReservation) -> Result<ReservationView, ReservationError> {
        validation::creation_lines(&request.lines)?;

        let products = self
            .load_products(request.lines.iter().map(|l| l.product))
            .await?;
        let required = aggregate_quantities(request.lines.iter().map(|l| (l.product, l.quantity)));

        let mut journal = LedgerJournal::new(&self.ledger);
        for (product_id, quantity) in required {
            let product = lookup(&products, product_id)?;
            if let Err(e) = journal.reserve(product, quantity).await {
                tracing::warn!(product = %product_id, quantity, error = %e, "Reservation rejected");
                journal.unwind().await;
                return Err(e);
            }
        }

        let id = ReservationId::new();
        let mut details = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = lookup(&products, line.product)?;
            details.push(ReservationDetail {
                id: DetailId::new(),
                reservation: id,
                product: line.product,
                quantity: line.quantity,
                subtotal: product.price.times(line.quantity),
            });
        }

        let now = self.env.clock.now();
        let reservation = Reservation {
            id,
            customer: request.customer,
            status: ReservationStatus::Pending,
            total: details.iter().map(|d| d.subtotal).sum(),
            details: details.iter().map(|d| d.id).collect(),
            created_at: now,
            updated_at: now,
            version: 1,
        };

        if let Err(e) = self.persist_new(&reservation, &details).await {
            journal.unwind().await;
            return Err(e);
        }
        journal.commit();

        tracing::info!(reservation = %id, total = %reservation.total, "Reservation created");
        drop(self.notifications.dispatch(id, reservation.customer));

        Ok(ReservationView {
            reservation,
            details,
        })
    }

    async fn persist_new(
        &self,
        reservation: &Reservation,
        details: &[ReservationDetail],
    ) -> Result<(), ReservationError> {
        self.env.details.insert_many(details.to_vec()).await?;
        if let Err(e) = self.env.reservations.insert(reservation.clone()).await {
            if let Err(cleanup) = self.env.details.delete_many(reservation.details.clone()).await {
                tracing::error!(
                    reservation = %reservation.id,
                    error = %cleanup,
                    "Failed to delete lines of unsaved reservation"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Applies line edits, a customer reassignment and/or a status change.
    ///
    /// Line edits are diffed by position against the stored lines. Net stock
    /// deltas are applied per product, releases first. A status change is
    /// then applied to the final line set:
    /// `PENDING → CONFIRMED` confirms holds, `PENDING → CANCELLED` releases
    /// them, and any other change moves no stock.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ReservationNotFound`]
    /// - [`ReservationError::Validation`], including
    ///   [`ValidationError::NotEditable`] for line edits on a reservation
    ///   that is no longer `PENDING`
    /// - [`ReservationError::ProductNotFound`]
    /// - [`ReservationError::InsufficientStock`]
    /// - [`ReservationError::InsufficientHold`] if the ledger disagrees with
    ///   the reservation's lines
    /// - [`ReservationError::Conflict`] if the reservation was modified or
    ///   deleted after it was loaded
    /// - [`ReservationError::Store`] on persistence failure
    #[tracing::instrument(skip(self, request), fields(reservation = %id))]
    pub async fn update(
        &self,
        id: ReservationId,
        request: UpdateReservation,
    ) -> Result<ReservationView, ReservationError> {
        let started = Instant::now();
        let result = self.update_inner(id, request).await;
        ReservationMetrics::record("update", started, &result);
        result
    }

    /// Confirms a reservation (`status = CONFIRMED`).
    ///
    /// # Errors
    ///
    /// Same as [`ReservationService::update`].
    pub async fn complete(&self, id: ReservationId) -> Result<ReservationView, ReservationError> {
        self.update(id, UpdateReservation::status(ReservationStatus::Confirmed))
            .await
    }

    /// Cancels a reservation (`status = CANCELLED`).
    ///
    /// # Errors
    ///
    /// Same as [`ReservationService::update`].
    pub async fn cancel(&self, id: ReservationId) -> Result<ReservationView, ReservationError> {
        self.update(id, UpdateReservation::status(ReservationStatus::Cancelled))
            .await
    }

    async fn update_inner(
        &self,
        id: ReservationId,
        request: UpdateReservation,
    ) -> Result<ReservationView, ReservationError> {
        let mut reservation = self.load(id).await?;
        let expected = reservation.version;

        if let Some(lines) = &request.lines {
            validation::update_lines(lines)?;
            if reservation.status != ReservationStatus::Pending {
                return Err(ValidationError::NotEditable {
                    status: reservation.status,
                }
                .into());
            }
        }

        let current = self
            .env
            .details
            .get_many(reservation.details.clone())
            .await?;
        let requested: Vec<LineUpdate> = request.lines.clone().unwrap_or_else(|| {
            current
                .iter()
                .map(|d| LineUpdate::new(d.product, d.quantity))
                .collect()
        });

        let next_status = request.status.unwrap_or(reservation.status);
        let effect = reservation.status.transition_effect(next_status);

        // Kept lines need no price, so metadata-only changes work even after
        // a line's product has left the catalog.
        let products = if request.lines.is_some() || effect != StockEffect::None {
            self.load_products(
                requested
                    .iter()
                    .map(|l| l.product)
                    .chain(current.iter().map(|d| d.product)),
            )
            .await?
        } else {
            HashMap::new()
        };
        let prices: HashMap<ProductId, Money> =
            products.iter().map(|(id, p)| (*id, p.price)).collect();

        let plan = plan_line_changes(&current, &requested, &prices)?;

        let unchanged = plan.is_noop()
            && next_status == reservation.status
            && request
                .customer
                .is_none_or(|customer| customer == reservation.customer);
        if unchanged {
            return Ok(ReservationView {
                reservation,
                details: current,
            });
        }

        let mut journal = LedgerJournal::new(&self.ledger);
        let applied = self
            .apply_ledger_changes(
                &mut journal,
                &products,
                &plan.deltas,
                effect,
                &plan.final_quantities(),
            )
            .await;
        if let Err(e) = applied {
            let e = self.explain_rejection(id, expected, e).await;
            tracing::warn!(error = %e, "Reservation update rejected");
            journal.unwind().await;
            return Err(e);
        }

        let changes = plan.materialize(id, DetailId::new);
        let lines = changes.lines.clone();
        let previous = reservation.status;
        reservation.details = changes.ids();
        reservation.total = changes.total();
        reservation.status = next_status;
        if let Some(customer) = request.customer {
            reservation.customer = customer;
        }
        reservation.updated_at = self.env.clock.now();

        let write = ReservationWrite::new(reservation, expected).with_lines(changes);
        let reservation = write.reservation.clone();
        match self.env.reservations.save(write).await {
            Ok(true) => journal.commit(),
            Ok(false) => {
                tracing::warn!(expected, "Reservation changed concurrently, unwinding stock");
                journal.unwind().await;
                return Err(ReservationError::Conflict(id));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save reservation, unwinding stock");
                journal.unwind().await;
                return Err(e.into());
            }
        }

        if previous == next_status {
            tracing::info!(total = %reservation.total, "Reservation updated");
        } else {
            tracing::info!(from = %previous, to = %next_status, ?effect, "Reservation status changed");
        }

        Ok(ReservationView {
            reservation,
            details: lines,
        })
    }

    async fn apply_ledger_changes(
        &self,
        journal: &mut LedgerJournal<'_>,
        products: &HashMap<ProductId, Product>,
        deltas: &StockDeltas,
        effect: StockEffect,
        final_lines: &[(ProductId, u32)],
    ) -> Result<(), ReservationError> {
        for (product_id, amount) in deltas.releases() {
            journal
                .release(lookup(products, product_id)?.stock, amount)
                .await?;
        }
        for (product_id, amount) in deltas.reservations() {
            journal.reserve(lookup(products, product_id)?, amount).await?;
        }
        for (product_id, amount) in final_lines {
            journal
                .apply(effect, lookup(products, *product_id)?.stock, *amount)
                .await?;
        }
        Ok(())
    }

    // ========================================================================
    // Remove
    // ========================================================================

    /// Deletes a reservation after reversing its stock impact.
    ///
    /// `PENDING` holds are released, `CONFIRMED` quantities are restocked and
    /// `CANCELLED` reservations move no stock. Lines whose product has been
    /// deleted since are skipped. Returns the deleted reservation.
    ///
    /// The reversal is undone if the delete does not land, so a failed
    /// removal can be retried.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ReservationNotFound`]
    /// - [`ReservationError::InsufficientHold`] if a `PENDING` reservation's
    ///   holds are missing from the ledger
    /// - [`ReservationError::Conflict`] if the reservation was modified or
    ///   deleted after it was loaded
    /// - [`ReservationError::Store`] on persistence failure
    #[tracing::instrument(skip(self), fields(reservation = %id))]
    pub async fn remove(&self, id: ReservationId) -> Result<ReservationView, ReservationError> {
        let started = Instant::now();
        let result = self.remove_inner(id).await;
        ReservationMetrics::record("remove", started, &result);
        result
    }

    async fn remove_inner(&self, id: ReservationId) -> Result<ReservationView, ReservationError> {
        let reservation = self.load(id).await?;
        let details = self
            .env
            .details
            .get_many(reservation.details.clone())
            .await?;

        let effect = reservation.status.removal_effect();
        let mut journal = LedgerJournal::new(&self.ledger);
        if effect != StockEffect::None {
            if let Err(e) = self.reverse_lines(&mut journal, &details, effect).await {
                let e = self.explain_rejection(id, reservation.version, e).await;
                tracing::warn!(error = %e, "Reservation removal rejected");
                journal.unwind().await;
                return Err(e);
            }
        }

        match self.env.reservations.delete(id, reservation.version).await {
            Ok(true) => journal.commit(),
            Ok(false) => {
                tracing::warn!("Reservation changed concurrently, unwinding stock");
                journal.unwind().await;
                return Err(ReservationError::Conflict(id));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete reservation, unwinding stock");
                journal.unwind().await;
                return Err(e.into());
            }
        }

        tracing::info!(status = %reservation.status, ?effect, "Reservation removed");
        Ok(ReservationView {
            reservation,
            details,
        })
    }

    async fn reverse_lines(
        &self,
        journal: &mut LedgerJournal<'_>,
        details: &[ReservationDetail],
        effect: StockEffect,
    ) -> Result<(), ReservationError> {
        let wanted = validation::referenced_products(details.iter().map(|d| d.product));
        let products: HashMap<ProductId, Product> = self
            .env
            .products
            .get_many(wanted)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let held = aggregate_quantities(details.iter().map(|d| (d.product, d.quantity)));
        for (product_id, amount) in held {
            match products.get(&product_id) {
                Some(product) => journal.apply(effect, product.stock, amount).await?,
                None => {
                    tracing::warn!(product = %product_id, amount, ?effect, "Skipping line of deleted product");
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Loads one reservation with its lines.
    ///
    /// # Errors
    ///
    /// [`ReservationError::ReservationNotFound`] or [`ReservationError::Store`].
    pub async fn get(&self, id: ReservationId) -> Result<ReservationView, ReservationError> {
        let reservation = self.load(id).await?;
        self.view(reservation).await
    }

    /// Every reservation of a customer, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// [`ReservationError::Store`] on persistence failure.
    pub async fn list_by_customer(
        &self,
        customer: CustomerId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<ReservationView>, ReservationError> {
        let filter = ReservationFilter {
            customer: Some(customer),
            status,
        };
        self.list(filter, None).await
    }

    /// One page of all reservations, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// [`ReservationError::Store`] on persistence failure.
    pub async fn list_all(
        &self,
        status: Option<ReservationStatus>,
        page: Page,
    ) -> Result<Vec<ReservationView>, ReservationError> {
        let filter = ReservationFilter {
            customer: None,
            status,
        };
        self.list(filter, Some(page)).await
    }

    async fn list(
        &self,
        filter: ReservationFilter,
        page: Option<Page>,
    ) -> Result<Vec<ReservationView>, ReservationError> {
        let reservations = self.env.reservations.list(filter, page).await?;
        let mut views = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            views.push(self.view(reservation).await?);
        }
        Ok(views)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load(&self, id: ReservationId) -> Result<Reservation, ReservationError> {
        self.env
            .reservations
            .get(id)
            .await?
            .ok_or(ReservationError::ReservationNotFound(id))
    }

    async fn view(&self, reservation: Reservation) -> Result<ReservationView, ReservationError> {
        let details = self
            .env
            .details
            .get_many(reservation.details.clone())
            .await?;
        Ok(ReservationView {
            reservation,
            details,
        })
    }

    /// A ledger rejection seen by a request whose reservation has since been
    /// modified or deleted is reported as a conflict.
    async fn explain_rejection(
        &self,
        id: ReservationId,
        expected: u64,
        error: ReservationError,
    ) -> ReservationError {
        if !matches!(
            error,
            ReservationError::InsufficientHold { .. } | ReservationError::InsufficientStock { .. }
        ) {
            return error;
        }
        match self.env.reservations.get(id).await {
            Ok(Some(stored)) if stored.version == expected => error,
            Ok(_) => ReservationError::Conflict(id),
            Err(_) => error,
        }
    }

    /// Loads every referenced product; the first missing one is an error.
    async fn load_products(
        &self,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> Result<HashMap<ProductId, Product>, ReservationError> {
        let wanted = validation::referenced_products(ids);
        let found: HashMap<ProductId, Product> = self
            .env
            .products
            .get_many(wanted.clone())
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        if let Some(missing) = wanted.iter().find(|id| !found.contains_key(id)) {
            return Err(ReservationError::ProductNotFound(*missing));
        }
        Ok(found)
    }
}

fn lookup(products: &HashMap<ProductId, Product>, id: ProductId) -> Result<&Product, ReservationError> {
    products.get(&id).ok_or(ReservationError::ProductNotFound(id))
}
