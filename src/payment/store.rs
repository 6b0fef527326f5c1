//! Payment store contract.
//!
//! All status writes are compare-and-swap style so stale writers no-op
//! instead of clobbering a terminal state.

use std::time::Duration;

use async_trait::async_trait;

use super::model::{PageRequest, PageResponse, Payment, PaymentFilter, PaymentId, PaymentStatus};
use crate::error::{ErrorCode, PaymentError};

/// Durable payment storage keyed by id and by unique idempotency key.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new payment.
    ///
    /// Idempotent on the idempotency key: when a payment with the same key
    /// already exists (including a concurrent duplicate), the existing
    /// record is returned and nothing is written.
    async fn create(&self, payment: Payment) -> Result<Payment, PaymentError>;

    async fn find(&self, id: PaymentId) -> Result<Option<Payment>, PaymentError>;

    async fn find_by_idempotency_key(&self, key: &str)
    -> Result<Option<Payment>, PaymentError>;

    /// CAS status update: applies only while the current status equals
    /// `expected`. Returns whether the update landed.
    async fn update_status_if(
        &self,
        id: PaymentId,
        expected: PaymentStatus,
        new: PaymentStatus,
    ) -> Result<bool, PaymentError>;

    /// Mark the payment FAILED with its classification, unless it already
    /// reached a terminal state. Returns whether the update landed.
    async fn mark_failed(
        &self,
        id: PaymentId,
        code: ErrorCode,
        message: &str,
    ) -> Result<bool, PaymentError>;

    /// Filtered, paged listing, newest first.
    async fn list(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Payment>, PaymentError>;

    /// Non-terminal payments untouched for longer than `threshold`, oldest
    /// first, capped at `limit`. Input for the recovery sweep.
    async fn find_stalled(
        &self,
        threshold: Duration,
        limit: usize,
    ) -> Result<Vec<Payment>, PaymentError>;
}
