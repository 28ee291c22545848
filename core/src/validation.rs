//! Input validation.
//!
//! Everything here runs before any stock mutation, so a rejected request has
//! no side effects.

use crate::types::{LineItem, LineUpdate, Money, ProductId, ReservationStatus};
use thiserror::Error;

/// Errors for requests that are malformed before they touch any store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier could not be parsed
    #[error("invalid {field} id format: {value:?}")]
    InvalidId {
        /// Which identifier was malformed
        field: &'static str,
        /// The rejected input
        value: String,
    },

    /// A reservation must contain at least one line
    #[error("reservation must contain at least one line item")]
    EmptyLineItems,

    /// A line quantity was zero or negative
    #[error("line {position}: quantity must be at least 1 (got {quantity})")]
    InvalidQuantity {
        /// Zero-based line position
        position: usize,
        /// The rejected quantity
        quantity: i64,
    },

    /// A supplied subtotal was negative
    #[error("line {position}: subtotal must not be negative (got {cents} cents)")]
    InvalidSubtotal {
        /// Zero-based line position
        position: usize,
        /// The rejected amount in cents
        cents: i64,
    },

    /// A status string was not one of `PENDING`, `CONFIRMED`, `CANCELLED`
    #[error("invalid reservation status: {0:?}")]
    InvalidStatus(String),

    /// A product price was negative
    #[error("price must not be negative (got {cents} cents)")]
    InvalidPrice {
        /// The rejected amount in cents
        cents: i64,
    },

    /// Lines can only be edited while the reservation still holds stock
    #[error("line items of a {status} reservation cannot be edited")]
    NotEditable {
        /// The stored status
        status: ReservationStatus,
    },
}

/// Converts a raw quantity into a validated line quantity.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidQuantity`] when `quantity < 1` or it does
/// not fit in a `u32`.
pub fn quantity(position: usize, quantity: i64) -> Result<u32, ValidationError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or(ValidationError::InvalidQuantity { position, quantity })
}

/// Converts a raw subtotal in cents into [`Money`].
///
/// # Errors
///
/// Returns [`ValidationError::InvalidSubtotal`] for negative amounts.
pub const fn subtotal(position: usize, cents: i64) -> Result<Money, ValidationError> {
    if cents < 0 {
        return Err(ValidationError::InvalidSubtotal { position, cents });
    }
    Ok(Money::from_cents(cents))
}

/// Checks a unit price.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidPrice`] for negative prices.
pub const fn price(price: Money) -> Result<Money, ValidationError> {
    if price.is_negative() {
        return Err(ValidationError::InvalidPrice {
            cents: price.cents(),
        });
    }
    Ok(price)
}

/// Parses an optional status filter; empty strings mean "no filter".
///
/// # Errors
///
/// Returns [`ValidationError::InvalidStatus`] for unknown values.
pub fn status_filter(raw: Option<&str>) -> Result<Option<ReservationStatus>, ValidationError> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

/// Validates the line list of a creation request.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyLineItems`] or
/// [`ValidationError::InvalidQuantity`].
pub fn creation_lines(lines: &[LineItem]) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyLineItems);
    }
    check_quantities(lines.iter().map(|l| l.quantity))
}

/// Validates the line list of an update request.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyLineItems`],
/// [`ValidationError::InvalidQuantity`] or [`ValidationError::InvalidSubtotal`].
pub fn update_lines(lines: &[LineUpdate]) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyLineItems);
    }
    check_quantities(lines.iter().map(|l| l.quantity))?;
    for (position, line) in lines.iter().enumerate() {
        if let Some(override_amount) = line.subtotal {
            subtotal(position, override_amount.cents())?;
        }
    }
    Ok(())
}

fn check_quantities(quantities: impl Iterator<Item = u32>) -> Result<(), ValidationError> {
    for (position, q) in quantities.enumerate() {
        if q == 0 {
            return Err(ValidationError::InvalidQuantity {
                position,
                quantity: 0,
            });
        }
    }
    Ok(())
}

/// Distinct products referenced by a list of lines, in first-seen order.
#[must_use]
pub fn referenced_products(products: impl IntoIterator<Item = ProductId>) -> Vec<ProductId> {
    let mut seen = Vec::new();
    for product in products {
        if !seen.contains(&product) {
            seen.push(product);
        }
    }
    seen
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn quantity_bounds() {
        assert_eq!(quantity(0, 1).unwrap(), 1);
        assert_eq!(
            quantity(2, 0).unwrap_err(),
            ValidationError::InvalidQuantity {
                position: 2,
                quantity: 0
            }
        );
        assert!(quantity(0, -4).is_err());
        assert!(quantity(0, i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn subtotal_must_not_be_negative() {
        assert_eq!(subtotal(0, 0).unwrap(), Money::ZERO);
        assert!(matches!(
            subtotal(1, -1),
            Err(ValidationError::InvalidSubtotal { position: 1, cents: -1 })
        ));
    }

    #[test]
    fn empty_creation_is_rejected() {
        assert_eq!(creation_lines(&[]), Err(ValidationError::EmptyLineItems));
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        let p = ProductId::new();
        let lines = [LineItem::new(p, 2), LineItem::new(p, 0)];
        assert!(matches!(
            creation_lines(&lines),
            Err(ValidationError::InvalidQuantity { position: 1, .. })
        ));
    }

    #[test]
    fn negative_override_is_rejected() {
        let lines = [LineUpdate::new(ProductId::new(), 1).with_subtotal(Money::from_cents(-5))];
        assert!(matches!(
            update_lines(&lines),
            Err(ValidationError::InvalidSubtotal { position: 0, cents: -5 })
        ));
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(status_filter(Some("")).unwrap(), None);
        assert_eq!(
            status_filter(Some("CONFIRMED")).unwrap(),
            Some(ReservationStatus::Confirmed)
        );
        assert!(status_filter(Some("SHIPPED")).is_err());
    }

    #[test]
    fn referenced_products_keeps_first_seen_order() {
        let (a, b) = (ProductId::new(), ProductId::new());
        assert_eq!(referenced_products([b, a, b, a]), vec![b, a]);
    }
}
