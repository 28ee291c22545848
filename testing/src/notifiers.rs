//! Notifier doubles.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stockroom_core::store::Notifier;
use stockroom_core::{NotifyError, ReservationCreated};
use tokio::sync::watch;

type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Records every delivered event.
///
/// Deliveries happen on detached tasks, so tests wait for them with
/// [`RecordingNotifier::wait_for`].
#[derive(Clone, Debug)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<ReservationCreated>>>,
    delivered: Arc<watch::Sender<usize>>,
}

impl RecordingNotifier {
    /// Create a notifier with no recorded events
    #[must_use]
    pub fn new() -> Self {
        let (delivered, _) = watch::channel(0);
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            delivered: Arc::new(delivered),
        }
    }

    /// Events delivered so far
    #[must_use]
    pub fn events(&self) -> Vec<ReservationCreated> {
        self.events.lock().unwrap().clone()
    }

    /// Waits until at least `count` events were delivered.
    ///
    /// Returns `false` on timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let mut rx = self.delivered.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|n| *n >= count))
            .await
            .is_ok_and(|r| r.is_ok())
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for RecordingNotifier {
    fn reservation_created(&self, event: ReservationCreated) -> NotifyFuture<'_> {
        Box::pin(async move {
            let count = {
                let mut events = self.events.lock().unwrap();
                events.push(event);
                events.len()
            };
            self.delivered.send_replace(count);
            Ok(())
        })
    }
}

/// Fails every delivery with a fixed error and counts the attempts.
#[derive(Clone, Debug)]
pub struct FailingNotifier {
    error: NotifyError,
    attempts: Arc<AtomicU32>,
}

impl FailingNotifier {
    /// Fails with a transient transport error (retried by the dispatcher)
    #[must_use]
    pub fn transient() -> Self {
        Self::with_error(NotifyError::Transport("connection refused".to_string()))
    }

    /// Fails with the given error
    #[must_use]
    pub fn with_error(error: NotifyError) -> Self {
        Self {
            error,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Delivery attempts so far
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Notifier for FailingNotifier {
    fn reservation_created(&self, _event: ReservationCreated) -> NotifyFuture<'_> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        })
    }
}
