//! HTTP boundary for the stockroom reservation engine.
//!
//! Handlers stay thin: they parse path, query and body values with the core
//! validators, call [`ReservationService`](stockroom_runtime::ReservationService)
//! or [`CatalogService`](stockroom_runtime::CatalogService), and map the
//! outcome through [`AppError`].
//!
//! # Request Flow
//!
//! 1. **Request id** is taken from `X-Request-ID` (or generated) and a span opened
//! 2. **Extract** path ids, query filters and JSON bodies
//! 3. **Validate** into core request types
//! 4. **Call** the service
//! 5. **Map** the result to JSON or an error body `{code, message}`
//!
//! # Example
//!
//! ```ignore
//! use stockroom_web::{AppState, build_router};
//!
//! let app = build_router(AppState::new(reservations, catalog));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use app::{Backends, build_state};
pub use config::{Config, ConfigError, Storage};
pub use error::AppError;
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
