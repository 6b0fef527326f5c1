//! The payment saga.
//!
//! Three steps, each recorded in the saga log once completed:
//!
//! 1. `execute-transfer` - move the money (retried under the transfer
//!    policy; the recorded [`TransferResult`] is replayed on resume).
//! 2. `mark-payment-failed` - only when step 1 reported a business
//!    failure; pins the payment to FAILED with its classification.
//! 3. `publish-completion` - enqueue the terminal-state notification.
//!
//! Every step is idempotent on its own, so the saga as a whole can be
//! restarted from scratch after any crash and converge on the same
//! terminal state without duplicating side effects.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::log::SagaLogStore;
use super::retry::{RetryPolicy, run_step};
use crate::error::{ErrorCode, PaymentError};
use crate::ledger::{TransferExecutor, TransferResult};
use crate::notify::CompletionNotifier;
use crate::payment::PaymentId;

pub const STEP_EXECUTE_TRANSFER: &str = "execute-transfer";
pub const STEP_MARK_FAILED: &str = "mark-payment-failed";
pub const STEP_PUBLISH_COMPLETION: &str = "publish-completion";

pub struct PaymentWorkflow {
    executor: Arc<TransferExecutor>,
    notifier: Arc<CompletionNotifier>,
    log: Arc<dyn SagaLogStore>,
    transfer_policy: RetryPolicy,
    notify_policy: RetryPolicy,
}

impl PaymentWorkflow {
    pub fn new(
        executor: Arc<TransferExecutor>,
        notifier: Arc<CompletionNotifier>,
        log: Arc<dyn SagaLogStore>,
    ) -> Self {
        Self {
            executor,
            notifier,
            log,
            transfer_policy: RetryPolicy::transfer(),
            notify_policy: RetryPolicy::notification(),
        }
    }

    pub fn with_policies(mut self, transfer: RetryPolicy, notify: RetryPolicy) -> Self {
        self.transfer_policy = transfer;
        self.notify_policy = notify;
        self
    }

    /// Drive the saga for `payment_id` to completion.
    ///
    /// Safe to call again for the same payment at any point: completed
    /// steps replay from the log instead of re-executing.
    pub async fn run(&self, payment_id: PaymentId) -> Result<(), PaymentError> {
        info!(payment_id = %payment_id, "Payment saga started");

        let result = self.transfer_step(payment_id).await?;

        if !result.successful {
            self.mark_failed_step(payment_id, &result).await?;
        }

        self.publish_step(payment_id).await?;

        info!(
            payment_id = %payment_id,
            successful = result.successful,
            "Payment saga finished"
        );
        Ok(())
    }

    async fn transfer_step(&self, payment_id: PaymentId) -> Result<TransferResult, PaymentError> {
        if let Some(recorded) = self
            .log
            .completed_result(payment_id, STEP_EXECUTE_TRANSFER)
            .await?
        {
            debug!(payment_id = %payment_id, "Replaying recorded transfer result");
            return Ok(serde_json::from_str(&recorded)?);
        }

        let result = match run_step(STEP_EXECUTE_TRANSFER, &self.transfer_policy, || {
            self.executor.execute_transfer(payment_id)
        })
        .await
        {
            Ok(result) => result,
            // Retry budget gone: the transfer never landed, so the payment
            // is failed with a processing classification and the saga
            // continues into compensation.
            Err(e @ PaymentError::RetriesExhausted { .. }) => {
                warn!(payment_id = %payment_id, error = %e, "Transfer step exhausted retries");
                TransferResult::failure(ErrorCode::PaymentProcessingFailed, e.to_string())
            }
            Err(e) => return Err(e),
        };

        self.log
            .mark_completed(
                payment_id,
                STEP_EXECUTE_TRANSFER,
                &serde_json::to_string(&result)?,
            )
            .await?;
        Ok(result)
    }

    async fn mark_failed_step(
        &self,
        payment_id: PaymentId,
        result: &TransferResult,
    ) -> Result<(), PaymentError> {
        if self
            .log
            .completed_result(payment_id, STEP_MARK_FAILED)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let code = result.error_code.unwrap_or(ErrorCode::PaymentProcessingFailed);
        let message = result
            .error_message
            .clone()
            .unwrap_or_else(|| "Transfer failed".to_string());

        run_step(STEP_MARK_FAILED, &self.transfer_policy, || {
            self.executor.mark_payment_failed(payment_id, code, &message)
        })
        .await?;
        self.log
            .mark_completed(payment_id, STEP_MARK_FAILED, "")
            .await?;
        Ok(())
    }

    async fn publish_step(&self, payment_id: PaymentId) -> Result<(), PaymentError> {
        if self
            .log
            .completed_result(payment_id, STEP_PUBLISH_COMPLETION)
            .await?
            .is_some()
        {
            return Ok(());
        }

        run_step(STEP_PUBLISH_COMPLETION, &self.notify_policy, || {
            self.notifier.publish_completion(payment_id)
        })
        .await?;
        self.log
            .mark_completed(payment_id, STEP_PUBLISH_COMPLETION, "")
            .await?;
        Ok(())
    }
}
