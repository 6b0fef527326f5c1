//! Payment intake.
//!
//! Validates and records a new payment exactly once per idempotency key,
//! then hands off to the saga engine. Submission never blocks on the
//! transfer outcome - callers observe the terminal status through the
//! get/list query path.

use std::sync::Arc;

use tracing::{info, warn};

use super::model::{PageRequest, PageResponse, Payment, PaymentFilter, PaymentId, PaymentStatus};
use super::store::PaymentStore;
use crate::error::PaymentError;
use crate::ledger::{AccountId, LedgerStore};
use crate::money::parse_amount;
use crate::saga::SagaEngine;

/// Incoming payment request, amount still in client string form.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub amount: String,
    pub currency: String,
}

/// Accepted handle returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAccepted {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
}

impl From<&Payment> for PaymentAccepted {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            status: payment.status,
        }
    }
}

pub struct PaymentService {
    payments: Arc<dyn PaymentStore>,
    ledger: Arc<dyn LedgerStore>,
    engine: Arc<dyn SagaEngine>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        ledger: Arc<dyn LedgerStore>,
        engine: Arc<dyn SagaEngine>,
    ) -> Self {
        Self {
            payments,
            ledger,
            engine,
        }
    }

    /// Submit a payment request under a client idempotency key.
    ///
    /// A repeated key returns the existing handle unchanged - no new
    /// validation, no new side effects - which makes submission safe to
    /// retry at the client/network layer. All validation happens before
    /// any persistent write.
    pub async fn submit(
        &self,
        request: PaymentRequest,
        idempotency_key: &str,
    ) -> Result<PaymentAccepted, PaymentError> {
        if let Some(existing) = self.payments.find_by_idempotency_key(idempotency_key).await? {
            info!(
                idempotency_key = idempotency_key,
                payment_id = %existing.id,
                "Duplicate payment request"
            );
            return Ok(PaymentAccepted::from(&existing));
        }

        let amount = self.validate(&request).await?;

        let payment = Payment::create(
            idempotency_key,
            request.sender_account_id,
            request.receiver_account_id,
            amount,
            request.currency,
        );
        // A concurrent duplicate collapses onto the winner's row here.
        let payment = self.payments.create(payment).await?;
        info!(payment_id = %payment.id, "Payment created");

        // The saga is keyed by payment id; a lost start signal is repaired
        // by the recovery sweep re-triggering PENDING payments.
        if let Err(e) = self.engine.start(payment.id).await {
            warn!(payment_id = %payment.id, error = %e, "Saga start failed, recovery sweep will re-trigger");
        }

        Ok(PaymentAccepted::from(&payment))
    }

    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, PaymentError> {
        self.payments
            .find(id)
            .await?
            .ok_or(PaymentError::PaymentNotFound(id.inner()))
    }

    pub async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Payment>, PaymentError> {
        self.payments.list(filter, page).await
    }

    async fn validate(
        &self,
        request: &PaymentRequest,
    ) -> Result<rust_decimal::Decimal, PaymentError> {
        if request.sender_account_id == request.receiver_account_id {
            return Err(PaymentError::SameAccount(request.sender_account_id.inner()));
        }

        if !self.ledger.exists(request.sender_account_id).await? {
            return Err(PaymentError::SenderAccountNotFound(
                request.sender_account_id.inner(),
            ));
        }

        if !self.ledger.exists(request.receiver_account_id).await? {
            return Err(PaymentError::ReceiverAccountNotFound(
                request.receiver_account_id.inner(),
            ));
        }

        parse_amount(&request.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Account, InMemoryLedger};
    use crate::payment::InMemoryPayments;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    /// Engine stub: intake must not depend on saga progress.
    struct NoopEngine;

    #[async_trait]
    impl SagaEngine for NoopEngine {
        async fn start(&self, _payment_id: PaymentId) -> Result<(), PaymentError> {
            Ok(())
        }
    }

    struct Harness {
        service: PaymentService,
        payments: Arc<InMemoryPayments>,
        ledger: Arc<InMemoryLedger>,
    }

    impl Harness {
        fn new() -> Self {
            let payments = Arc::new(InMemoryPayments::new());
            let ledger = Arc::new(InMemoryLedger::new(payments.clone()));
            let service = PaymentService::new(payments.clone(), ledger.clone(), Arc::new(NoopEngine));
            Self {
                service,
                payments,
                ledger,
            }
        }

        async fn account(&self) -> AccountId {
            let id = AccountId::new();
            self.ledger
                .insert_account(Account::new(id, dec!(100), "USD"))
                .await
                .unwrap();
            id
        }

        fn request(&self, sender: AccountId, receiver: AccountId, amount: &str) -> PaymentRequest {
            PaymentRequest {
                sender_account_id: sender,
                receiver_account_id: receiver,
                amount: amount.to_string(),
                currency: "USD".to_string(),
            }
        }
    }

    #[tokio::test]
    async fn test_submit_accepts_pending() {
        let h = Harness::new();
        let (a, b) = (h.account().await, h.account().await);

        let accepted = h.service.submit(h.request(a, b, "40"), "k1").await.unwrap();
        assert_eq!(accepted.status, PaymentStatus::Pending);

        let stored = h.service.get_payment(accepted.payment_id).await.unwrap();
        assert_eq!(stored.amount, dec!(40));
        assert_eq!(stored.idempotency_key, "k1");
    }

    #[tokio::test]
    async fn test_duplicate_key_returns_same_payment() {
        let h = Harness::new();
        let (a, b) = (h.account().await, h.account().await);

        let first = h.service.submit(h.request(a, b, "40"), "k1").await.unwrap();
        let second = h.service.submit(h.request(a, b, "40"), "k1").await.unwrap();
        assert_eq!(first.payment_id, second.payment_id);

        let listed = h
            .service
            .list_payments(&PaymentFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total_elements, 1);
    }

    #[tokio::test]
    async fn test_invalid_amount_creates_no_payment() {
        let h = Harness::new();
        let (a, b) = (h.account().await, h.account().await);

        for amount in ["0", "-40", "nope"] {
            let err = h
                .service
                .submit(h.request(a, b, amount), &format!("bad-{}", amount))
                .await
                .unwrap_err();
            assert!(matches!(err, PaymentError::InvalidAmount(_)));
        }

        let listed = h
            .service
            .list_payments(&PaymentFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total_elements, 0);
    }

    #[tokio::test]
    async fn test_same_account_rejected_before_persistence() {
        let h = Harness::new();
        let a = h.account().await;

        let err = h.service.submit(h.request(a, a, "40"), "k1").await.unwrap_err();
        assert!(matches!(err, PaymentError::SameAccount(_)));
        assert!(
            h.payments
                .find_by_idempotency_key("k1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unknown_accounts_rejected() {
        let h = Harness::new();
        let a = h.account().await;
        let ghost = AccountId::new();

        let err = h.service.submit(h.request(ghost, a, "40"), "k1").await.unwrap_err();
        assert!(matches!(err, PaymentError::SenderAccountNotFound(_)));

        let err = h.service.submit(h.request(a, ghost, "40"), "k2").await.unwrap_err();
        assert!(matches!(err, PaymentError::ReceiverAccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_payment() {
        let h = Harness::new();
        let err = h.service.get_payment(PaymentId::new()).await.unwrap_err();
        assert!(matches!(err, PaymentError::PaymentNotFound(_)));
    }
}
