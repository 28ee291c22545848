//! Domain types for the reservation engine.
//!
//! This module contains the identifiers, value objects and records shared by
//! every layer: stock counters, products, reservation lines and the
//! reservation aggregate itself, plus the request shapes accepted by the
//! reservation service.

use crate::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a product
    ProductId,
    "product"
);
uuid_id!(
    /// Unique identifier for a stock record (one per product)
    StockId,
    "stock"
);
uuid_id!(
    /// Unique identifier for a customer
    CustomerId,
    "user"
);
uuid_id!(
    /// Unique identifier for a reservation
    ReservationId,
    "reservation"
);
uuid_id!(
    /// Unique identifier for a reservation line
    DetailId,
    "reservation detail"
);

// ============================================================================
// Money
// ============================================================================

/// Money amount in cents (to avoid floating point issues)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a new money amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the value in cents
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Flat line pricing: `unit price × quantity`.
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }

    /// Whether the amount is negative (never valid for prices or subtotals)
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

// ============================================================================
// Reservation status
// ============================================================================

/// Lifecycle status of a reservation.
///
/// `PENDING → {CONFIRMED, CANCELLED}`. Confirmed and cancelled reservations
/// are treated as final by convention; see [`crate::status`] for the stock
/// movement each change implies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    /// Stock is held, nothing deducted yet
    #[default]
    Pending,
    /// Held stock was deducted from physical quantity
    Confirmed,
    /// Held stock was released
    Cancelled,
}

impl ReservationStatus {
    /// Wire representation (`PENDING`, `CONFIRMED`, `CANCELLED`)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this status is final by convention
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Stock and products
// ============================================================================

/// Physical and held counters for one product.
///
/// Invariant: `reserved <= quantity` after every successful ledger write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    /// Stock record identifier
    pub id: StockId,
    /// Physical units owned
    pub quantity: u32,
    /// Units held against pending reservations
    pub reserved: u32,
}

impl Stock {
    /// Creates a freshly seeded stock record (nothing reserved)
    #[must_use]
    pub const fn new(id: StockId, quantity: u32) -> Self {
        Self {
            id,
            quantity,
            reserved: 0,
        }
    }

    /// Units eligible for new holds: `max(0, quantity - reserved)`
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved)
    }

    /// Whether the counters satisfy `reserved <= quantity`
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.reserved <= self.quantity
    }
}

/// Catalog product as seen by the reservation engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Unique product code
    pub code: String,
    /// Display name (used in stock error messages)
    pub name: String,
    /// Unit price
    pub price: Money,
    /// The product's one stock record
    pub stock: StockId,
}

/// Input for creating a product together with its stock record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Unique product code
    pub code: String,
    /// Display name
    pub name: String,
    /// Unit price
    pub price: Money,
    /// Physical units to seed the stock record with
    pub initial_quantity: u32,
}

/// Stock counters reported for a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// Product the counters belong to
    pub product: ProductId,
    /// Physical units owned
    pub quantity: u32,
    /// Units held
    pub reserved: u32,
    /// `max(0, quantity - reserved)`
    pub available: u32,
}

impl StockLevel {
    /// Builds the reported level from a stock record
    #[must_use]
    pub const fn of(product: ProductId, stock: &Stock) -> Self {
        Self {
            product,
            quantity: stock.quantity,
            reserved: stock.reserved,
            available: stock.available(),
        }
    }
}

// ============================================================================
// Reservations
// ============================================================================

/// One (product, quantity, subtotal) line owned by a reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetail {
    /// Line identifier
    pub id: DetailId,
    /// Owning reservation
    pub reservation: ReservationId,
    /// Reserved product
    pub product: ProductId,
    /// Reserved units (at least 1)
    pub quantity: u32,
    /// Cached line amount
    pub subtotal: Money,
}

/// The reservation aggregate.
///
/// `details` is ordered: position `i` lines up with position `i` of an
/// update payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation identifier
    pub id: ReservationId,
    /// Customer the reservation belongs to
    pub customer: CustomerId,
    /// Lifecycle status
    pub status: ReservationStatus,
    /// Sum of the current line subtotals
    pub total: Money,
    /// Ordered line references
    pub details: Vec<DetailId>,
    /// When the reservation was created
    pub created_at: DateTime<Utc>,
    /// When the reservation was last modified
    pub updated_at: DateTime<Utc>,
    /// Bumped by every successful save; saves are conditional on it
    pub version: u64,
}

/// A reservation together with its realised, ordered lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationView {
    /// The aggregate
    #[serde(flatten)]
    pub reservation: Reservation,
    /// Lines in aggregate order
    #[serde(rename = "reservation_detail")]
    pub details: Vec<ReservationDetail>,
}

impl ReservationView {
    /// Sum of the realised line subtotals
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.details.iter().map(|d| d.subtotal).sum()
    }
}

/// A requested line on creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product to reserve
    pub product: ProductId,
    /// Units to reserve
    pub quantity: u32,
}

impl LineItem {
    /// Creates a new line item
    #[must_use]
    pub const fn new(product: ProductId, quantity: u32) -> Self {
        Self { product, quantity }
    }
}

/// A requested line on update, matched to the current lines by position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineUpdate {
    /// Product for this position
    pub product: ProductId,
    /// Units for this position
    pub quantity: u32,
    /// Explicit subtotal; honoured only when product and quantity are unchanged
    pub subtotal: Option<Money>,
}

impl LineUpdate {
    /// Creates a line update without a subtotal override
    #[must_use]
    pub const fn new(product: ProductId, quantity: u32) -> Self {
        Self {
            product,
            quantity,
            subtotal: None,
        }
    }

    /// Attaches an explicit subtotal
    #[must_use]
    pub const fn with_subtotal(mut self, subtotal: Money) -> Self {
        self.subtotal = Some(subtotal);
        self
    }
}

/// Request to create a reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReservation {
    /// Customer placing the reservation
    pub customer: CustomerId,
    /// Requested lines, in display order
    pub lines: Vec<LineItem>,
}

/// Request to modify a reservation. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReservation {
    /// Reassign the reservation to another customer
    pub customer: Option<CustomerId>,
    /// Replace the ordered line list (diffed by position)
    pub lines: Option<Vec<LineUpdate>>,
    /// Move to a new status
    pub status: Option<ReservationStatus>,
}

impl UpdateReservation {
    /// Status-only update (used by the complete/cancel shortcuts)
    #[must_use]
    pub const fn status(status: ReservationStatus) -> Self {
        Self {
            customer: None,
            lines: None,
            status: Some(status),
        }
    }
}

/// Filter for reservation listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationFilter {
    /// Only this customer's reservations
    pub customer: Option<CustomerId>,
    /// Only reservations in this status
    pub status: Option<ReservationStatus>,
}

/// Page/limit pagination. `page` starts at 1; `limit` is clamped to `1..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    page: u32,
    limit: u32,
}

impl Page {
    /// Default page size
    pub const DEFAULT_LIMIT: u32 = 50;
    /// Largest accepted page size
    pub const MAX_LIMIT: u32 = 100;

    /// Builds a page, clamping out-of-range values instead of rejecting them.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// 1-based page number
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records to skip
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Event emitted (best-effort) after a reservation is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCreated {
    /// The new reservation
    pub reservation_id: ReservationId,
    /// Its customer
    pub customer_id: CustomerId,
    /// The customer's display name, when known
    pub customer_name: Option<String>,
}
