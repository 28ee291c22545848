//! Positional line-diff engine.
//!
//! A reservation's lines form an ordered list, and an update supplies a new
//! ordered list. Position `i` of the request is compared with position `i` of
//! the stored lines:
//!
//! | Stored      | Requested          | Result                                   |
//! |-------------|--------------------|------------------------------------------|
//! | `(P, q)`    | `(P, q)`           | unchanged; explicit subtotal kept as-is  |
//! | `(P, q)`    | `(P, q')`          | resized; stock delta `q' - q` on `P`     |
//! | `(P, q)`    | `(P', q')`         | replaced; release `q` of `P`, hold `q'`  |
//! | —           | `(P, q)`           | added; hold `q` of `P`                   |
//! | `(P, q)`    | —                  | removed; release `q` of `P`              |
//!
//! Stock deltas are netted per product before anything touches the ledger,
//! and the runtime applies all releases before any new holds.
//!
//! Planning is pure: [`plan_line_changes`] never performs I/O, and
//! [`LinePlan::materialize`] only allocates identifiers for new lines.

use crate::error::ReservationError;
use crate::types::{DetailId, LineUpdate, Money, ProductId, ReservationDetail, ReservationId};
use std::collections::HashMap;

// ============================================================================
// Stock deltas
// ============================================================================

/// Net signed stock change per product, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StockDeltas {
    entries: Vec<(ProductId, i64)>,
}

impl StockDeltas {
    /// Creates an empty delta set
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Accumulates `delta` units for `product`.
    pub fn add(&mut self, product: ProductId, delta: i64) {
        if let Some((_, net)) = self.entries.iter_mut().find(|(p, _)| *p == product) {
            *net += delta;
        } else {
            self.entries.push((product, delta));
        }
    }

    /// Net delta for one product (0 when untouched).
    #[must_use]
    pub fn get(&self, product: ProductId) -> i64 {
        self.entries
            .iter()
            .find(|(p, _)| *p == product)
            .map_or(0, |(_, net)| *net)
    }

    /// Products whose holds shrink, with the amount to release.
    pub fn releases(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.entries
            .iter()
            .filter(|(_, net)| *net < 0)
            .map(|(p, net)| (*p, clamp_units(net.unsigned_abs())))
    }

    /// Products whose holds grow, with the amount to reserve.
    pub fn reservations(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.entries
            .iter()
            .filter(|(_, net)| *net > 0)
            .map(|(p, net)| (*p, clamp_units(net.unsigned_abs())))
    }

    /// Whether every product nets out to zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|(_, net)| *net == 0)
    }
}

fn clamp_units(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Sums quantities per product, keeping first-seen order.
///
/// Used to turn a line list into one ledger call per product.
#[must_use]
pub fn aggregate_quantities<I>(lines: I) -> Vec<(ProductId, u32)>
where
    I: IntoIterator<Item = (ProductId, u32)>,
{
    let mut totals: Vec<(ProductId, u32)> = Vec::new();
    for (product, quantity) in lines {
        if let Some((_, sum)) = totals.iter_mut().find(|(p, _)| *p == product) {
            *sum = sum.saturating_add(quantity);
        } else {
            totals.push((product, quantity));
        }
    }
    totals
}

// ============================================================================
// Line operations
// ============================================================================

/// A line that does not exist yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewLine {
    /// Product
    pub product: ProductId,
    /// Units
    pub quantity: u32,
    /// `price × quantity`
    pub subtotal: Money,
}

/// What happens to one position (or one trailing stored line).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOp {
    /// Same product and quantity, stored subtotal untouched
    Keep(ReservationDetail),
    /// Same line id with a new quantity and/or subtotal
    Update(ReservationDetail),
    /// Stored line deleted, new line created in its position
    Replace {
        /// The stored line being dropped
        old: ReservationDetail,
        /// Its replacement
        line: NewLine,
    },
    /// New position beyond the stored length
    Add(NewLine),
    /// Stored position beyond the requested length
    Remove(ReservationDetail),
}

impl LineOp {
    /// `(product, quantity)` this op leaves in the reservation, if any.
    #[must_use]
    pub const fn surviving(&self) -> Option<(ProductId, u32)> {
        match self {
            Self::Keep(d) | Self::Update(d) => Some((d.product, d.quantity)),
            Self::Replace { line, .. } | Self::Add(line) => Some((line.product, line.quantity)),
            Self::Remove(_) => None,
        }
    }

    /// Subtotal this op leaves in the reservation (zero for removals).
    #[must_use]
    pub const fn surviving_subtotal(&self) -> Money {
        match self {
            Self::Keep(d) | Self::Update(d) => d.subtotal,
            Self::Replace { line, .. } | Self::Add(line) => line.subtotal,
            Self::Remove(_) => Money::ZERO,
        }
    }
}

/// Result of diffing stored lines against a requested list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinePlan {
    /// One op per position; removals come after every surviving position
    pub ops: Vec<LineOp>,
    /// Net ledger movement per product
    pub deltas: StockDeltas,
}

impl LinePlan {
    /// Whether applying the plan would change nothing at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.deltas.is_zero() && self.ops.iter().all(|op| matches!(op, LineOp::Keep(_)))
    }

    /// Sum of the subtotals the plan leaves in place.
    #[must_use]
    pub fn total(&self) -> Money {
        self.ops.iter().map(LineOp::surviving_subtotal).sum()
    }

    /// Final `(product, quantity)` per product, aggregated, in line order.
    #[must_use]
    pub fn final_quantities(&self) -> Vec<(ProductId, u32)> {
        aggregate_quantities(self.ops.iter().filter_map(LineOp::surviving))
    }

    /// Turns the plan into concrete record writes.
    ///
    /// `next_id` is called once per created line, in position order.
    pub fn materialize(
        &self,
        reservation: ReservationId,
        mut next_id: impl FnMut() -> DetailId,
    ) -> DetailChanges {
        let mut changes = DetailChanges::default();
        let mut realise = |line: &NewLine, changes: &mut DetailChanges| {
            let detail = ReservationDetail {
                id: next_id(),
                reservation,
                product: line.product,
                quantity: line.quantity,
                subtotal: line.subtotal,
            };
            changes.insert.push(detail.clone());
            changes.lines.push(detail);
        };

        for op in &self.ops {
            match op {
                LineOp::Keep(detail) => changes.lines.push(detail.clone()),
                LineOp::Update(detail) => {
                    changes.update.push(detail.clone());
                    changes.lines.push(detail.clone());
                }
                LineOp::Replace { old, line } => {
                    changes.delete.push(old.id);
                    realise(line, &mut changes);
                }
                LineOp::Add(line) => realise(line, &mut changes),
                LineOp::Remove(old) => changes.delete.push(old.id),
            }
        }
        changes
    }
}

/// Record writes produced by [`LinePlan::materialize`].
///
/// Apply in field order: `delete`, then `update`, then `insert`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetailChanges {
    /// Lines to delete
    pub delete: Vec<DetailId>,
    /// Lines to overwrite
    pub update: Vec<ReservationDetail>,
    /// Lines to create
    pub insert: Vec<ReservationDetail>,
    /// Final ordered lines of the reservation
    pub lines: Vec<ReservationDetail>,
}

impl DetailChanges {
    /// Final ordered line ids.
    #[must_use]
    pub fn ids(&self) -> Vec<DetailId> {
        self.lines.iter().map(|d| d.id).collect()
    }

    /// Final total (always recomputed from the lines).
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().map(|d| d.subtotal).sum()
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Diffs `current` against `requested` by position.
///
/// `prices` must contain the unit price of every product whose subtotal has
/// to be recomputed (resized, replaced and added lines).
///
/// # Errors
///
/// Returns [`ReservationError::ProductNotFound`] when a needed price is
/// missing.
pub fn plan_line_changes(
    current: &[ReservationDetail],
    requested: &[LineUpdate],
    prices: &HashMap<ProductId, Money>,
) -> Result<LinePlan, ReservationError> {
    let price_of = |product: ProductId| {
        prices
            .get(&product)
            .copied()
            .ok_or(ReservationError::ProductNotFound(product))
    };

    let overlap = current.len().min(requested.len());
    let mut ops = Vec::with_capacity(current.len().max(requested.len()));
    let mut deltas = StockDeltas::new();

    for (stored, wanted) in current.iter().zip(requested) {
        if stored.product == wanted.product {
            if stored.quantity == wanted.quantity {
                match wanted.subtotal {
                    Some(subtotal) if subtotal != stored.subtotal => {
                        ops.push(LineOp::Update(ReservationDetail {
                            subtotal,
                            ..stored.clone()
                        }));
                    }
                    _ => ops.push(LineOp::Keep(stored.clone())),
                }
            } else {
                deltas.add(
                    stored.product,
                    i64::from(wanted.quantity) - i64::from(stored.quantity),
                );
                ops.push(LineOp::Update(ReservationDetail {
                    quantity: wanted.quantity,
                    subtotal: price_of(wanted.product)?.times(wanted.quantity),
                    ..stored.clone()
                }));
            }
        } else {
            deltas.add(stored.product, -i64::from(stored.quantity));
            deltas.add(wanted.product, i64::from(wanted.quantity));
            ops.push(LineOp::Replace {
                old: stored.clone(),
                line: NewLine {
                    product: wanted.product,
                    quantity: wanted.quantity,
                    subtotal: price_of(wanted.product)?.times(wanted.quantity),
                },
            });
        }
    }

    for wanted in &requested[overlap..] {
        deltas.add(wanted.product, i64::from(wanted.quantity));
        ops.push(LineOp::Add(NewLine {
            product: wanted.product,
            quantity: wanted.quantity,
            subtotal: price_of(wanted.product)?.times(wanted.quantity),
        }));
    }

    for stored in &current[overlap..] {
        deltas.add(stored.product, -i64::from(stored.quantity));
        ops.push(LineOp::Remove(stored.clone()));
    }

    Ok(LinePlan { ops, deltas })
}
