//! Stock movements implied by status changes and removals.

use crate::types::ReservationStatus;

/// Ledger operation applied to every line of a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockEffect {
    /// Nothing to do
    None,
    /// Move holds into a physical deduction
    Confirm,
    /// Drop holds
    Release,
    /// Add units back to physical quantity
    Restock,
}

impl ReservationStatus {
    /// Effect of moving from `self` to `next`.
    ///
    /// Only `PENDING → CONFIRMED` and `PENDING → CANCELLED` move stock. Any
    /// other change, including `CONFIRMED → CANCELLED`, is accepted but has no
    /// stock effect.
    #[must_use]
    pub const fn transition_effect(self, next: Self) -> StockEffect {
        match (self, next) {
            (Self::Pending, Self::Confirmed) => StockEffect::Confirm,
            (Self::Pending, Self::Cancelled) => StockEffect::Release,
            _ => StockEffect::None,
        }
    }

    /// Effect of deleting a reservation in this status.
    #[must_use]
    pub const fn removal_effect(self) -> StockEffect {
        match self {
            Self::Pending => StockEffect::Release,
            Self::Confirmed => StockEffect::Restock,
            Self::Cancelled => StockEffect::None,
        }
    }
}
