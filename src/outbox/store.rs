//! Outbox storage contract and the in-memory implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::record::{OutboxRecord, OutboxStatus};
use crate::error::PaymentError;

/// Durable queue of outbound messages.
///
/// Appends deduplicate on (topic, partition key), so enqueueing the same
/// logical message any number of times yields exactly one record. Delivery
/// is at-least-once: a record stays eligible for dispatch until a send is
/// confirmed with [`OutboxStore::mark_completed`].
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Enqueue a record. Returns false when a record for the same
    /// (topic, partition key) already exists; nothing is written then.
    async fn append(&self, record: OutboxRecord) -> Result<bool, PaymentError>;

    /// Record that a send attempt is about to happen. Persisted before the
    /// channel call so a crash mid-send still shows up in the attempt count.
    async fn mark_attempted(&self, id: Uuid) -> Result<(), PaymentError>;

    /// Confirm delivery. Idempotent.
    async fn mark_completed(&self, id: Uuid) -> Result<(), PaymentError>;

    /// Records due for dispatch, oldest first: never-attempted records are
    /// due immediately, attempted-but-unconfirmed ones only after
    /// `resubmit_after` has passed since the last attempt.
    async fn fetch_pending(
        &self,
        resubmit_after: Duration,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, PaymentError>;
}

#[derive(Default)]
pub struct InMemoryOutbox {
    records: DashMap<Uuid, OutboxRecord>,
    by_key: DashMap<(String, String), Uuid>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<OutboxRecord> {
        self.records.get(&id).map(|entry| entry.clone())
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutbox {
    async fn append(&self, record: OutboxRecord) -> Result<bool, PaymentError> {
        let key = (record.topic.clone(), record.partition_key.clone());
        match self.by_key.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.id);
                self.records.insert(record.id, record);
                Ok(true)
            }
        }
    }

    async fn mark_attempted(&self, id: Uuid) -> Result<(), PaymentError> {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.attempts += 1;
            record.last_attempt_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), PaymentError> {
        if let Some(mut record) = self.records.get_mut(&id)
            && record.status != OutboxStatus::Completed
        {
            record.status = OutboxStatus::Completed;
            record.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fetch_pending(
        &self,
        resubmit_after: Duration,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, PaymentError> {
        let resubmit_cutoff = Utc::now()
            - chrono::Duration::from_std(resubmit_after)
                .map_err(|e| PaymentError::Internal(format!("invalid resubmit interval: {e}")))?;

        let mut due: Vec<OutboxRecord> = self
            .records
            .iter()
            .filter(|entry| entry.status == OutboxStatus::Pending)
            .filter(|entry| match entry.last_attempt_at {
                None => true,
                Some(last) => last < resubmit_cutoff,
            })
            .map(|entry| entry.clone())
            .collect();

        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        due.truncate(limit);
        Ok(due)
    }
}
