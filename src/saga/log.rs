//! Durable saga step log.
//!
//! Records which steps completed for a payment, with the serialized step
//! result, so a resumed saga replays recorded outcomes instead of
//! re-executing side effects. First write wins per (payment, step).

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::{PgPool, Row};

use crate::error::PaymentError;
use crate::payment::PaymentId;

#[async_trait]
pub trait SagaLogStore: Send + Sync {
    /// Record `step` as completed with its serialized result.
    ///
    /// Returns false when the step was already recorded; the stored result
    /// is never overwritten.
    async fn mark_completed(
        &self,
        payment_id: PaymentId,
        step: &str,
        result: &str,
    ) -> Result<bool, PaymentError>;

    /// Serialized result of a completed step, if any.
    async fn completed_result(
        &self,
        payment_id: PaymentId,
        step: &str,
    ) -> Result<Option<String>, PaymentError>;
}

#[derive(Default)]
pub struct InMemorySagaLog {
    steps: DashMap<(PaymentId, String), String>,
}

impl InMemorySagaLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SagaLogStore for InMemorySagaLog {
    async fn mark_completed(
        &self,
        payment_id: PaymentId,
        step: &str,
        result: &str,
    ) -> Result<bool, PaymentError> {
        match self.steps.entry((payment_id, step.to_string())) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(result.to_string());
                Ok(true)
            }
        }
    }

    async fn completed_result(
        &self,
        payment_id: PaymentId,
        step: &str,
    ) -> Result<Option<String>, PaymentError> {
        Ok(self
            .steps
            .get(&(payment_id, step.to_string()))
            .map(|entry| entry.clone()))
    }
}

pub struct PgSagaLog {
    pool: PgPool,
}

impl PgSagaLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SagaLogStore for PgSagaLog {
    async fn mark_completed(
        &self,
        payment_id: PaymentId,
        step: &str,
        result: &str,
    ) -> Result<bool, PaymentError> {
        let outcome = sqlx::query(
            r#"
            INSERT INTO saga_steps (payment_id, step, result, completed_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (payment_id, step) DO NOTHING
            "#,
        )
        .bind(payment_id.inner())
        .bind(step)
        .bind(result)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    async fn completed_result(
        &self,
        payment_id: PaymentId,
        step: &str,
    ) -> Result<Option<String>, PaymentError> {
        let row = sqlx::query("SELECT result FROM saga_steps WHERE payment_id = $1 AND step = $2")
            .bind(payment_id.inner())
            .bind(step)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("result")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_write_wins() {
        let log = InMemorySagaLog::new();
        let id = PaymentId::new();

        assert!(log.mark_completed(id, "execute-transfer", "a").await.unwrap());
        assert!(!log.mark_completed(id, "execute-transfer", "b").await.unwrap());

        let stored = log.completed_result(id, "execute-transfer").await.unwrap();
        assert_eq!(stored.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_steps_are_independent() {
        let log = InMemorySagaLog::new();
        let id = PaymentId::new();

        log.mark_completed(id, "execute-transfer", "r").await.unwrap();
        assert!(
            log.completed_result(id, "publish-completion")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            log.completed_result(PaymentId::new(), "execute-transfer")
                .await
                .unwrap()
                .is_none()
        );
    }
}
