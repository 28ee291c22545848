//! Product endpoints, limited to what touches stock.
//!
//! - `POST /products` - create a product with its stock record
//! - `GET /products/:id/stock` - current counters
//! - `DELETE /products/:id` - delete a product and its stock record

use crate::error::AppError;
use crate::state::AppState;
use crate::WebResult;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use stockroom_core::{Money, NewProduct, Product, ProductId, StockLevel};

/// Body of `POST /products`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    /// Unique product code
    pub code: String,
    /// Display name
    pub name: String,
    /// Unit price in cents
    pub price: i64,
    /// Units to seed the stock record with
    #[serde(default)]
    pub initial_quantity: u32,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(body: CreateProductRequest) -> Self {
        Self {
            code: body.code,
            name: body.name,
            price: Money::from_cents(body.price),
            initial_quantity: body.initial_quantity,
        }
    }
}

fn product_id(raw: &str) -> Result<ProductId, AppError> {
    Ok(raw.parse::<ProductId>()?)
}

/// Create a product and seed its stock.
///
/// # Errors
///
/// 400 for a malformed body or negative price.
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> WebResult<(StatusCode, Json<Product>)> {
    let Json(body) = payload?;
    let product = state.catalog.create_product(body.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Current stock counters of a product.
///
/// # Errors
///
/// 400 for a malformed id, 404 when the product or its stock is missing.
pub async fn product_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<StockLevel>> {
    let level = state.catalog.stock_for(product_id(&id)?).await?;
    Ok(Json(level))
}

/// Delete a product together with its stock record.
///
/// # Errors
///
/// 400 for a malformed id, 404 when the product does not exist, 409 while
/// units of it are reserved.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<StatusCode> {
    state.catalog.delete_product(product_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
