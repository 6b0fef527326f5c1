//! Outbox record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery state of an outbox record.
///
/// PENDING covers both never-attempted and attempted-but-unconfirmed
/// records; only a confirmed send moves a record to COMPLETED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    Pending,
    Completed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OutboxStatus::Pending),
            "COMPLETED" => Some(OutboxStatus::Completed),
            _ => None,
        }
    }
}

/// One durable outbound message, unique per (topic, partition key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub topic: String,
    pub partition_key: String,
    pub payload: String,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    pub fn new(
        topic: impl Into<String>,
        partition_key: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            partition_key: partition_key.into(),
            payload: payload.into(),
            status: OutboxStatus::Pending,
            attempts: 0,
            created_at: Utc::now(),
            last_attempt_at: None,
            completed_at: None,
        }
    }
}
