//! HTTP request handlers.

pub mod health;
pub mod products;
pub mod reservations;

pub use health::health_check;
