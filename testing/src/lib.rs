//! # Stockroom Testing
//!
//! Testing utilities for the Stockroom reservation engine.
//!
//! This crate provides:
//! - [`InMemoryBackend`], one of each `stockroom-memory` store plus seeding helpers ([`memory`])
//! - Notifier doubles that record or fail deliveries ([`notifiers`])
//! - A fixed clock for deterministic timestamps
//! - proptest strategies for ledger operation sequences ([`properties`])
//!
//! ## Example
//!
//! ```
//! use stockroom_testing::InMemoryBackend;
//!
//! let backend = InMemoryBackend::new();
//! let widget = backend.add_product("Widget", 1_000, 10);
//! assert_eq!(backend.stock_of(&widget).available(), 10);
//! ```

use chrono::{DateTime, Utc};
use stockroom_core::environment::Clock;

pub mod memory;
pub mod notifiers;
pub mod properties;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use stockroom_testing::mocks::FixedClock;
    /// use stockroom_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is a constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use memory::{
    InMemoryBackend, InMemoryCustomerDirectory, InMemoryDetailStore, InMemoryProductCatalog,
    InMemoryReservationStore, InMemoryStockLedger,
};
pub use mocks::{FixedClock, test_clock};
pub use notifiers::{FailingNotifier, RecordingNotifier};
