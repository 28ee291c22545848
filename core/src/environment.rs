//! Injected dependencies that are not stores.

use chrono::{DateTime, Utc};

/// Clock trait for time abstraction.
///
/// Reservation timestamps come from here so tests can pin them.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation of [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
