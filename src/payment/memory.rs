//! In-memory payment store.
//!
//! Backs the tests and single-process wiring. The unique idempotency-key
//! index goes through the map's entry API so concurrent duplicate creates
//! collapse onto one row.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::model::{PageRequest, PageResponse, Payment, PaymentFilter, PaymentId, PaymentStatus};
use super::store::PaymentStore;
use crate::error::{ErrorCode, PaymentError};

#[derive(Default)]
pub struct InMemoryPayments {
    payments: DashMap<PaymentId, Payment>,
    by_key: DashMap<String, PaymentId>,
}

impl InMemoryPayments {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPayments {
    async fn create(&self, payment: Payment) -> Result<Payment, PaymentError> {
        match self.by_key.entry(payment.idempotency_key.clone()) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                self.payments
                    .get(&id)
                    .map(|p| p.clone())
                    .ok_or_else(|| {
                        PaymentError::Internal(format!(
                            "idempotency index points at missing payment {}",
                            id
                        ))
                    })
            }
            Entry::Vacant(slot) => {
                slot.insert(payment.id);
                self.payments.insert(payment.id, payment.clone());
                Ok(payment)
            }
        }
    }

    async fn find(&self, id: PaymentId) -> Result<Option<Payment>, PaymentError> {
        Ok(self.payments.get(&id).map(|p| p.clone()))
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Payment>, PaymentError> {
        let id = match self.by_key.get(key) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.payments.get(&id).map(|p| p.clone()))
    }

    async fn update_status_if(
        &self,
        id: PaymentId,
        expected: PaymentStatus,
        new: PaymentStatus,
    ) -> Result<bool, PaymentError> {
        let mut payment = match self.payments.get_mut(&id) {
            Some(p) => p,
            None => return Ok(false),
        };
        if payment.status != expected {
            return Ok(false);
        }
        payment.status = new;
        payment.version += 1;
        payment.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_failed(
        &self,
        id: PaymentId,
        code: ErrorCode,
        message: &str,
    ) -> Result<bool, PaymentError> {
        let mut payment = match self.payments.get_mut(&id) {
            Some(p) => p,
            None => return Ok(false),
        };
        if payment.status.is_terminal() {
            return Ok(false);
        }
        payment.status = PaymentStatus::Failed;
        payment.error_code = Some(code);
        payment.error_message = Some(message.to_string());
        payment.version += 1;
        payment.updated_at = Utc::now();
        Ok(true)
    }

    async fn list(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Payment>, PaymentError> {
        let mut matching: Vec<Payment> = self
            .payments
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        // Newest first.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_elements = matching.len();
        let size = page.size.max(1);
        let total_pages = total_elements.div_ceil(size);
        let content: Vec<Payment> = matching
            .into_iter()
            .skip(page.page * size)
            .take(size)
            .collect();

        Ok(PageResponse {
            content,
            page: page.page,
            size,
            total_elements,
            total_pages,
        })
    }

    async fn find_stalled(
        &self,
        threshold: Duration,
        limit: usize,
    ) -> Result<Vec<Payment>, PaymentError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(threshold)
                .map_err(|e| PaymentError::Internal(format!("bad stale threshold: {}", e)))?;

        let mut stalled: Vec<Payment> = self
            .payments
            .iter()
            .filter(|entry| !entry.status.is_terminal() && entry.updated_at < cutoff)
            .map(|entry| entry.value().clone())
            .collect();
        stalled.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        stalled.truncate(limit);
        Ok(stalled)
    }
}
