//! Completion notifier.
//!
//! Builds the notification for a terminal payment and hands it to the
//! outbox. Publishing is only enqueueing here - the dispatcher owns actual
//! delivery - so this step is fast, idempotent and survives broker outages.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::event::PaymentNotification;
use crate::error::PaymentError;
use crate::outbox::{OutboxRecord, OutboxStore};
use crate::payment::{PaymentId, PaymentStore};

/// Topic carrying terminal payment notifications, keyed by payment id so
/// per-payment ordering survives partitioning.
pub const PAYMENT_NOTIFICATIONS_TOPIC: &str = "payment-notifications";

pub struct CompletionNotifier {
    payments: Arc<dyn PaymentStore>,
    outbox: Arc<dyn OutboxStore>,
}

impl CompletionNotifier {
    pub fn new(payments: Arc<dyn PaymentStore>, outbox: Arc<dyn OutboxStore>) -> Self {
        Self { payments, outbox }
    }

    /// Enqueue the terminal-state notification for `payment_id`.
    ///
    /// Only COMPLETED and FAILED payments produce a notification; anything
    /// else is a stale or premature signal and is skipped with a warning.
    /// The outbox deduplicates on payment id, so repeated invocations
    /// collapse onto one record.
    pub async fn publish_completion(&self, payment_id: PaymentId) -> Result<(), PaymentError> {
        let payment = self.payments.find(payment_id).await?.ok_or_else(|| {
            PaymentError::Internal(format!("payment not found in notifier: {}", payment_id))
        })?;

        if !payment.status.is_terminal() {
            warn!(
                payment_id = %payment_id,
                status = %payment.status,
                "Skipping notification for non-terminal payment"
            );
            return Ok(());
        }

        let event = PaymentNotification::from_payment(&payment);
        let payload = serde_json::to_string(&event)?;
        let record = OutboxRecord::new(
            PAYMENT_NOTIFICATIONS_TOPIC,
            payment_id.to_string(),
            payload,
        );

        if self.outbox.append(record).await? {
            info!(payment_id = %payment_id, status = %payment.status, "Notification enqueued");
        } else {
            debug!(payment_id = %payment_id, "Notification already enqueued");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AccountId;
    use crate::outbox::InMemoryOutbox;
    use crate::payment::{InMemoryPayments, Payment, PaymentStatus};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    struct Harness {
        notifier: CompletionNotifier,
        payments: Arc<InMemoryPayments>,
        outbox: Arc<InMemoryOutbox>,
    }

    impl Harness {
        fn new() -> Self {
            let payments = Arc::new(InMemoryPayments::new());
            let outbox = Arc::new(InMemoryOutbox::new());
            let notifier = CompletionNotifier::new(payments.clone(), outbox.clone());
            Self {
                notifier,
                payments,
                outbox,
            }
        }

        async fn payment(&self) -> PaymentId {
            let p = self
                .payments
                .create(Payment::create(
                    format!("k-{}", uuid::Uuid::new_v4()),
                    AccountId::new(),
                    AccountId::new(),
                    dec!(40),
                    "USD",
                ))
                .await
                .unwrap();
            p.id
        }

        async fn pending_records(&self) -> usize {
            self.outbox
                .fetch_pending(Duration::from_secs(0), 100)
                .await
                .unwrap()
                .len()
        }
    }

    #[tokio::test]
    async fn test_terminal_payment_enqueued_once() {
        let h = Harness::new();
        let id = h.payment().await;
        h.payments
            .update_status_if(id, PaymentStatus::Pending, PaymentStatus::Processing)
            .await
            .unwrap();
        h.payments
            .update_status_if(id, PaymentStatus::Processing, PaymentStatus::Completed)
            .await
            .unwrap();

        h.notifier.publish_completion(id).await.unwrap();
        h.notifier.publish_completion(id).await.unwrap();

        assert_eq!(h.pending_records().await, 1);
    }

    #[tokio::test]
    async fn test_non_terminal_payment_not_enqueued() {
        let h = Harness::new();
        let id = h.payment().await;

        h.notifier.publish_completion(id).await.unwrap();
        assert_eq!(h.pending_records().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_payment_is_fatal() {
        let h = Harness::new();
        let err = h
            .notifier
            .publish_completion(PaymentId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Internal(_)));
    }
}
