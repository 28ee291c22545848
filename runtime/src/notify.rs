//! Best-effort "reservation created" notifications.
//!
//! The dispatcher runs each delivery on a detached tokio task. Failures are
//! retried with backoff, then logged and counted; they never reach the
//! caller of the operation that triggered them.

use crate::metrics::ReservationMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use stockroom_core::store::{CustomerDirectory, Notifier};
use stockroom_core::{CustomerId, NotifyError, ReservationCreated, ReservationId};
use tokio::task::JoinHandle;

type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Final state of one dispatched notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The notifier accepted the event
    Delivered,
    /// Every attempt failed
    Failed,
}

/// Spawns notification deliveries.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    customers: Arc<dyn CustomerDirectory>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with the default retry policy.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, customers: Arc<dyn CustomerDirectory>) -> Self {
        Self {
            notifier,
            customers,
            policy: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sends `ReservationCreated` in the background.
    ///
    /// The returned handle may be dropped; the task keeps running.
    pub fn dispatch(&self, reservation: ReservationId, customer: CustomerId) -> JoinHandle<Delivery> {
        let notifier = Arc::clone(&self.notifier);
        let customers = Arc::clone(&self.customers);
        let policy = self.policy.clone();

        tokio::spawn(async move {
            let customer_name = match customers.display_name(customer).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(%customer, error = %e, "Customer lookup failed, notifying without name");
                    None
                }
            };
            let event = ReservationCreated {
                reservation_id: reservation,
                customer_id: customer,
                customer_name,
            };

            let result = retry_with_predicate(
                &policy,
                || notifier.reservation_created(event.clone()),
                NotifyError::is_transient,
            )
            .await;

            match result {
                Ok(()) => {
                    ReservationMetrics::record_notification("delivered");
                    tracing::debug!(%reservation, "Reservation notification delivered");
                    Delivery::Delivered
                }
                Err(exhausted) => {
                    ReservationMetrics::record_notification("failed");
                    tracing::warn!(
                        %reservation,
                        attempts = exhausted.attempts,
                        error = %exhausted.error,
                        "Reservation notification dropped"
                    );
                    Delivery::Failed
                }
            }
        })
    }
}

/// Notifier that only logs the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn reservation_created(&self, event: ReservationCreated) -> NotifyFuture<'_> {
        Box::pin(async move {
            tracing::info!(
                reservation = %event.reservation_id,
                customer = %event.customer_id,
                customer_name = event.customer_name.as_deref().unwrap_or("-"),
                "Reservation created"
            );
            Ok(())
        })
    }
}

/// Notifier that POSTs the event as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Creates a webhook notifier with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    fn reservation_created(&self, event: ReservationCreated) -> NotifyFuture<'_> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .json(&serde_json::json!({
                    "event": "reservation.created",
                    "reservationId": event.reservation_id,
                    "userId": event.customer_id,
                    "userName": event.customer_name,
                }))
                .send()
                .await
                .map_err(|e| NotifyError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(NotifyError::Rejected {
                    status: status.as_u16(),
                })
            }
        })
    }
}
