//! Saga engine: owns the running sagas.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, error};

use super::workflow::PaymentWorkflow;
use crate::error::PaymentError;
use crate::payment::PaymentId;

/// Starts sagas. Implementations must be idempotent per payment id:
/// starting a saga that is already live (or already finished) is a no-op,
/// never a second concurrent execution.
#[async_trait]
pub trait SagaEngine: Send + Sync {
    async fn start(&self, payment_id: PaymentId) -> Result<(), PaymentError>;
}

/// Runs each saga as a spawned task in this process.
///
/// The live set guarantees at most one task per payment id at a time.
/// Restarting after the task finished is allowed and harmless - the
/// workflow replays completed steps from the saga log.
pub struct InProcessEngine {
    workflow: Arc<PaymentWorkflow>,
    live: Arc<DashMap<PaymentId, ()>>,
}

impl InProcessEngine {
    pub fn new(workflow: Arc<PaymentWorkflow>) -> Self {
        Self {
            workflow,
            live: Arc::new(DashMap::new()),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[async_trait]
impl SagaEngine for InProcessEngine {
    async fn start(&self, payment_id: PaymentId) -> Result<(), PaymentError> {
        match self.live.entry(payment_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                debug!(payment_id = %payment_id, "Saga already live, not starting another");
                return Ok(());
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let workflow = self.workflow.clone();
        let live = self.live.clone();
        tokio::spawn(async move {
            if let Err(e) = workflow.run(payment_id).await {
                // The payment stays non-terminal; the recovery sweep will
                // pick it up and start a fresh saga.
                error!(payment_id = %payment_id, error = %e, "Payment saga failed");
            }
            live.remove(&payment_id);
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Account, AccountId, InMemoryLedger, LedgerStore, TransferExecutor};
    use crate::notify::CompletionNotifier;
    use crate::outbox::{InMemoryOutbox, OutboxStore};
    use crate::payment::{InMemoryPayments, Payment, PaymentStatus, PaymentStore};
    use crate::saga::log::InMemorySagaLog;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    struct Harness {
        engine: InProcessEngine,
        payments: Arc<InMemoryPayments>,
        ledger: Arc<InMemoryLedger>,
        outbox: Arc<InMemoryOutbox>,
    }

    impl Harness {
        fn new() -> Self {
            let payments = Arc::new(InMemoryPayments::new());
            let ledger = Arc::new(InMemoryLedger::new(payments.clone()));
            let outbox = Arc::new(InMemoryOutbox::new());
            let executor = Arc::new(TransferExecutor::new(ledger.clone(), payments.clone()));
            let notifier = Arc::new(CompletionNotifier::new(payments.clone(), outbox.clone()));
            let workflow = Arc::new(PaymentWorkflow::new(
                executor,
                notifier,
                Arc::new(InMemorySagaLog::new()),
            ));
            Self {
                engine: InProcessEngine::new(workflow),
                payments,
                ledger,
                outbox,
            }
        }

        async fn await_terminal(&self, id: PaymentId) -> PaymentStatus {
            for _ in 0..200 {
                let payment = self.payments.find(id).await.unwrap().unwrap();
                if payment.status.is_terminal() {
                    return payment.status;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("payment never reached a terminal state");
        }
    }

    #[tokio::test]
    async fn test_started_saga_completes_payment() {
        let h = Harness::new();
        let a = AccountId::new();
        let b = AccountId::new();
        h.ledger.insert_account(Account::new(a, dec!(100), "USD")).await.unwrap();
        h.ledger.insert_account(Account::new(b, dec!(0), "USD")).await.unwrap();
        let payment = h
            .payments
            .create(Payment::create("k1", a, b, dec!(40), "USD"))
            .await
            .unwrap();

        h.engine.start(payment.id).await.unwrap();

        assert_eq!(h.await_terminal(payment.id).await, PaymentStatus::Completed);
        assert_eq!(h.ledger.find_account(a).await.unwrap().unwrap().balance, dec!(60));
    }

    #[tokio::test]
    async fn test_repeated_starts_converge_on_one_outcome() {
        let h = Harness::new();
        let a = AccountId::new();
        let b = AccountId::new();
        h.ledger.insert_account(Account::new(a, dec!(100), "USD")).await.unwrap();
        h.ledger.insert_account(Account::new(b, dec!(0), "USD")).await.unwrap();
        let payment = h
            .payments
            .create(Payment::create("k1", a, b, dec!(40), "USD"))
            .await
            .unwrap();

        for _ in 0..5 {
            h.engine.start(payment.id).await.unwrap();
        }
        h.await_terminal(payment.id).await;

        // Give any straggler task time to finish, then restart once more.
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.engine.start(payment.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(h.ledger.find_account(a).await.unwrap().unwrap().balance, dec!(60));
        assert_eq!(h.ledger.find_account(b).await.unwrap().unwrap().balance, dec!(40));
        let notifications = h
            .outbox
            .fetch_pending(Duration::from_secs(0), 100)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(h.engine.live_count(), 0);
    }
}
