//! Ledger transfer executor.
//!
//! Performs one atomic debit/credit for a payment id. The unit of business
//! correctness: safe to invoke any number of times for the same payment
//! (the saga retries it at-least-once), business failures come back as a
//! normal [`TransferResult`], and only infrastructure or invariant
//! failures propagate as errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::lock_order::lock_order;
use super::store::LedgerStore;
use crate::error::{ErrorCode, PaymentError};
use crate::payment::{PaymentId, PaymentStatus, PaymentStore};

/// Outcome of one transfer attempt.
///
/// `successful = false` is a business failure recorded on the payment; it
/// is never raised as an error across the executor boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub successful: bool,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

impl TransferResult {
    pub fn success() -> Self {
        Self {
            successful: true,
            error_code: None,
            error_message: None,
        }
    }

    /// Success-equivalent result for a payment that already reached a
    /// terminal state before this invocation.
    pub fn already_processed() -> Self {
        Self::success()
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            successful: false,
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }
}

pub struct TransferExecutor {
    ledger: Arc<dyn LedgerStore>,
    payments: Arc<dyn PaymentStore>,
}

impl TransferExecutor {
    pub fn new(ledger: Arc<dyn LedgerStore>, payments: Arc<dyn PaymentStore>) -> Self {
        Self { ledger, payments }
    }

    /// Execute the transfer for `payment_id`.
    ///
    /// Re-entry semantics: a terminal payment returns "already processed"
    /// without touching accounts. A PROCESSING payment is resumed - its
    /// account effects commit atomically with the COMPLETED transition, so
    /// a PROCESSING row provably has none applied yet.
    pub async fn execute_transfer(
        &self,
        payment_id: PaymentId,
    ) -> Result<TransferResult, PaymentError> {
        info!(payment_id = %payment_id, "Executing transfer");

        let payment = self.payments.find(payment_id).await?.ok_or_else(|| {
            PaymentError::Internal(format!("payment not found in executor: {}", payment_id))
        })?;

        match payment.status {
            PaymentStatus::Completed | PaymentStatus::Failed => {
                info!(payment_id = %payment_id, status = %payment.status, "Payment already processed");
                return Ok(TransferResult::already_processed());
            }
            PaymentStatus::Pending => {
                // Persist PROCESSING before touching accounts so a crash
                // mid-transfer leaves a detectable non-terminal state.
                let moved = self
                    .payments
                    .update_status_if(payment_id, PaymentStatus::Pending, PaymentStatus::Processing)
                    .await?;
                if !moved {
                    let current = self.payments.find(payment_id).await?.ok_or_else(|| {
                        PaymentError::Internal(format!(
                            "payment vanished after CAS failure: {}",
                            payment_id
                        ))
                    })?;
                    if current.status.is_terminal() {
                        return Ok(TransferResult::already_processed());
                    }
                    // Another invocation moved it to PROCESSING; resume below.
                }
            }
            PaymentStatus::Processing => {
                warn!(payment_id = %payment_id, "Resuming in-flight payment");
            }
        }

        // Deterministic global order: smaller account id first, regardless
        // of sender/receiver role.
        let (first, second) = lock_order(payment.sender_account_id, payment.receiver_account_id);
        let lease = self.ledger.lock_pair(first, second).await?;

        let mut sender = match lease.get(payment.sender_account_id) {
            Some(account) => account,
            None => {
                drop(lease);
                return self
                    .fail(
                        payment_id,
                        ErrorCode::SenderAccountNotFound,
                        format!("Sender account not found: {}", payment.sender_account_id),
                    )
                    .await;
            }
        };

        let mut receiver = match lease.get(payment.receiver_account_id) {
            Some(account) => account,
            None => {
                drop(lease);
                return self
                    .fail(
                        payment_id,
                        ErrorCode::ReceiverAccountNotFound,
                        format!("Receiver account not found: {}", payment.receiver_account_id),
                    )
                    .await;
            }
        };

        let available = sender.balance;
        if sender.debit(payment.amount).is_err() {
            drop(lease);
            return self
                .fail(
                    payment_id,
                    ErrorCode::InsufficientBalance,
                    format!(
                        "Insufficient balance. Available: {}, Required: {}",
                        available, payment.amount
                    ),
                )
                .await;
        }

        // Credit cannot fail - no upper bound invariant.
        receiver.credit(payment.amount);

        let committed = lease.commit(vec![sender, receiver], payment_id).await?;
        if committed {
            info!(payment_id = %payment_id, "Transfer successful");
            Ok(TransferResult::success())
        } else {
            Ok(TransferResult::already_processed())
        }
    }

    /// Record a business failure on the payment.
    ///
    /// Idempotent: no-ops when the payment already reached a terminal
    /// state, so a stale failure signal can never overwrite a true success.
    pub async fn mark_payment_failed(
        &self,
        payment_id: PaymentId,
        code: ErrorCode,
        message: &str,
    ) -> Result<(), PaymentError> {
        info!(payment_id = %payment_id, code = %code, "Marking payment as FAILED");

        let payment = self.payments.find(payment_id).await?.ok_or_else(|| {
            PaymentError::Internal(format!("payment not found in executor: {}", payment_id))
        })?;

        match payment.status {
            PaymentStatus::Completed => {
                warn!(payment_id = %payment_id, "Cannot mark payment as FAILED, already COMPLETED");
            }
            PaymentStatus::Failed => {
                debug!(payment_id = %payment_id, "Payment already FAILED");
            }
            _ => {
                self.payments.mark_failed(payment_id, code, message).await?;
            }
        }
        Ok(())
    }

    async fn fail(
        &self,
        payment_id: PaymentId,
        code: ErrorCode,
        message: String,
    ) -> Result<TransferResult, PaymentError> {
        warn!(payment_id = %payment_id, code = %code, "{}", message);
        let marked = self.payments.mark_failed(payment_id, code, &message).await?;
        if !marked {
            debug!(payment_id = %payment_id, "Payment already terminal, failure not recorded");
        }
        Ok(TransferResult::failure(code, message))
    }
}
