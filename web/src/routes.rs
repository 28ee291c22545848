//! Router configuration.

use crate::handlers::{health_check, products, reservations};
use crate::middleware::request_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Build the complete Axum router.
///
/// Every route runs inside the request id layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Reservations
        .route(
            "/reservations",
            post(reservations::create_reservation).get(reservations::list_reservations),
        )
        .route(
            "/reservations/user/:user_id",
            get(reservations::list_customer_reservations),
        )
        .route(
            "/reservations/:id",
            get(reservations::get_reservation)
                .patch(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route(
            "/reservations/:id/complete",
            post(reservations::complete_reservation),
        )
        .route(
            "/reservations/:id/cancel",
            post(reservations::cancel_reservation),
        )
        // Products (stock effects only)
        .route("/products", post(products::create_product))
        .route("/products/:id", delete(products::delete_product))
        .route("/products/:id/stock", get(products::product_stock))
        .layer(request_id_layer())
        .with_state(state)
}
