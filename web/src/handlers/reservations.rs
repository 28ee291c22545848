//! Reservation endpoints.
//!
//! - `POST /reservations` - create
//! - `GET /reservations?status=&page=&limit=` - list every reservation
//! - `GET /reservations/user/:user_id?status=` - list one customer's reservations
//! - `GET /reservations/:id` - fetch with lines
//! - `PATCH /reservations/:id` - edit lines, status or customer
//! - `POST /reservations/:id/complete` - confirm
//! - `POST /reservations/:id/cancel` - cancel
//! - `DELETE /reservations/:id` - remove, reversing its stock effect
//!
//! Amounts are integer cents on the wire.

use crate::error::AppError;
use crate::state::AppState;
use crate::WebResult;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use stockroom_core::validation::{self, ValidationError};
use stockroom_core::{
    CreateReservation, CustomerId, LineItem, LineUpdate, Page, ProductId, ReservationId,
    ReservationStatus, ReservationView, UpdateReservation,
};

// ============================================================================
// Request Types
// ============================================================================

/// One line of a create or update payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    /// Product id
    #[serde(alias = "productId")]
    pub product: String,
    /// Requested units (must be at least 1)
    pub quantity: i64,
    /// Subtotal override in cents; only honoured on updates
    #[serde(default)]
    pub subtotal: Option<i64>,
}

/// Body of `POST /reservations`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    /// Customer id
    #[serde(alias = "userId")]
    pub user: String,
    /// Ordered lines
    #[serde(default)]
    pub reservation_detail: Vec<LineRequest>,
}

/// Body of `PATCH /reservations/:id`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    /// New customer id
    #[serde(default, alias = "userId")]
    pub user: Option<String>,
    /// New status
    #[serde(default)]
    pub status: Option<String>,
    /// Replacement lines, matched to the current ones by position
    #[serde(default)]
    pub reservation_detail: Option<Vec<LineRequest>>,
}

/// Query of `GET /reservations`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Status filter; empty means none
    pub status: Option<String>,
    /// 1-based page (clamped)
    pub page: Option<i64>,
    /// Page size (clamped to 1..=100)
    pub limit: Option<i64>,
}

/// Query of `GET /reservations/user/:user_id`.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Status filter; empty means none
    pub status: Option<String>,
}

impl CreateReservationRequest {
    /// Parses ids and quantities into a service request.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn into_request(self) -> Result<CreateReservation, ValidationError> {
        let customer = self.user.parse::<CustomerId>()?;
        let lines = self
            .reservation_detail
            .iter()
            .enumerate()
            .map(|(position, line)| {
                Ok(LineItem::new(
                    line.product.parse::<ProductId>()?,
                    validation::quantity(position, line.quantity)?,
                ))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Ok(CreateReservation { customer, lines })
    }
}

impl UpdateReservationRequest {
    /// Parses ids, quantities, subtotals and the status into a service request.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn into_request(self) -> Result<UpdateReservation, ValidationError> {
        let customer = self
            .user
            .as_deref()
            .map(str::parse::<CustomerId>)
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<ReservationStatus>)
            .transpose()?;
        let lines = self
            .reservation_detail
            .map(|lines| {
                lines
                    .iter()
                    .enumerate()
                    .map(|(position, line)| {
                        let update = LineUpdate::new(
                            line.product.parse::<ProductId>()?,
                            validation::quantity(position, line.quantity)?,
                        );
                        match line.subtotal {
                            Some(cents) => {
                                Ok(update.with_subtotal(validation::subtotal(position, cents)?))
                            }
                            None => Ok(update),
                        }
                    })
                    .collect::<Result<Vec<_>, ValidationError>>()
            })
            .transpose()?;
        Ok(UpdateReservation {
            customer,
            lines,
            status,
        })
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

impl ListQuery {
    /// The requested page, clamped into range.
    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(self.page.map(clamp_to_u32), self.limit.map(clamp_to_u32))
    }
}

fn reservation_id(raw: &str) -> Result<ReservationId, AppError> {
    Ok(raw.parse::<ReservationId>()?)
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a reservation, holding stock for every line.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/reservations \
///   -H "Content-Type: application/json" \
///   -d '{
///     "user": "0b8f6a52-3c1e-4a53-9d3e-1f1d3c2b4a10",
///     "reservationDetail": [
///       {"product": "9a2b7c1e-5d4f-4e3a-8b2c-7d6e5f4a3b21", "quantity": 2}
///     ]
///   }'
/// ```
///
/// # Errors
///
/// 400 for malformed input, 404 for an unknown product, 409 when stock is short.
pub async fn create_reservation(
    State(state): State<AppState>,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> WebResult<(StatusCode, Json<ReservationView>)> {
    let Json(body) = payload?;
    let request = body.into_request()?;
    let view = state.reservations.create(request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// List every reservation, newest first.
///
/// # Errors
///
/// 400 for an unknown status or non-numeric page values.
pub async fn list_reservations(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> WebResult<Json<Vec<ReservationView>>> {
    let Query(query) = query?;
    let status = validation::status_filter(query.status.as_deref())?;
    let views = state.reservations.list_all(status, query.page()).await?;
    Ok(Json(views))
}

/// List one customer's reservations, newest first.
///
/// # Errors
///
/// 400 for a malformed customer id or unknown status.
pub async fn list_customer_reservations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> WebResult<Json<Vec<ReservationView>>> {
    let Query(query) = query?;
    let customer = user_id.parse::<CustomerId>().map_err(AppError::from)?;
    let status = validation::status_filter(query.status.as_deref())?;
    let views = state.reservations.list_by_customer(customer, status).await?;
    Ok(Json(views))
}

/// Fetch a reservation with its lines.
///
/// # Errors
///
/// 400 for a malformed id, 404 when it does not exist.
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<ReservationView>> {
    let view = state.reservations.get(reservation_id(&id)?).await?;
    Ok(Json(view))
}

/// Apply a line edit, status change or customer reassignment.
///
/// # Errors
///
/// 400 for malformed input or a non-editable reservation, 404 when it does
/// not exist, 409 when stock is short.
pub async fn update_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateReservationRequest>, JsonRejection>,
) -> WebResult<Json<ReservationView>> {
    let id = reservation_id(&id)?;
    let Json(body) = payload?;
    let view = state.reservations.update(id, body.into_request()?).await?;
    Ok(Json(view))
}

/// Confirm a reservation.
///
/// # Errors
///
/// 400 for a malformed id, 404 when it does not exist.
pub async fn complete_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<ReservationView>> {
    let view = state.reservations.complete(reservation_id(&id)?).await?;
    Ok(Json(view))
}

/// Cancel a reservation.
///
/// # Errors
///
/// 400 for a malformed id, 404 when it does not exist.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<ReservationView>> {
    let view = state.reservations.cancel(reservation_id(&id)?).await?;
    Ok(Json(view))
}

/// Delete a reservation and reverse its stock effect. Returns what was deleted.
///
/// # Errors
///
/// 400 for a malformed id, 404 when it does not exist.
pub async fn delete_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<ReservationView>> {
    let view = state.reservations.remove(reservation_id(&id)?).await?;
    Ok(Json(view))
}
