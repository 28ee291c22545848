//! Application state for Axum handlers.

use stockroom_runtime::{CatalogService, ReservationService};

/// Services shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Reservation lifecycle
    pub reservations: ReservationService,
    /// Product and stock lifecycle
    pub catalog: CatalogService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(reservations: ReservationService, catalog: CatalogService) -> Self {
        Self {
            reservations,
            catalog,
        }
    }
}
