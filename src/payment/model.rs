//! Payment record, status machine and query types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::ledger::AccountId;

/// Opaque payment identifier. Also the saga's workflow id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Generate a new unique PaymentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Payment lifecycle.
///
/// ```text
/// PENDING --(executor starts)--> PROCESSING --(transfer ok)--> COMPLETED
///                                PROCESSING --(transfer fails)--> FAILED
/// ```
///
/// COMPLETED and FAILED are terminal: no further transition is permitted,
/// and every writer goes through a status-conditioned update so a stale
/// writer no-ops instead of overwriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Terminal states admit no further transition.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PROCESSING" => Some(PaymentStatus::Processing),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::parse(s).ok_or(())
    }
}

/// Durable payment record, owned by the payment store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// Client-supplied token; unique across all payments.
    pub idempotency_key: String,
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a new PENDING payment with a fresh system-generated id.
    pub fn create(
        idempotency_key: impl Into<String>,
        sender_account_id: AccountId,
        receiver_account_id: AccountId,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            idempotency_key: idempotency_key.into(),
            sender_account_id,
            receiver_account_id,
            amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            error_code: None,
            error_message: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Payment[{}] {} -> {} amount={} {} status={}",
            self.id,
            self.sender_account_id,
            self.receiver_account_id,
            self.amount,
            self.currency,
            self.status
        )
    }
}

/// Filter for the payment listing query. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub sender_account_id: Option<AccountId>,
    pub status: Option<PaymentStatus>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        if let Some(sender) = self.sender_account_id
            && payment.sender_account_id != sender
        {
            return false;
        }
        if let Some(status) = self.status
            && payment.status != status
        {
            return false;
        }
        true
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

/// One page of results, newest first.
#[derive(Debug, Clone)]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_terminal() {
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Processing,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("SETTLED"), None);
    }

    #[test]
    fn test_create_defaults() {
        let sender = AccountId::new();
        let receiver = AccountId::new();
        let payment = Payment::create("key-1", sender, receiver, dec!(40), "USD");

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.version, 0);
        assert!(payment.error_code.is_none());
        assert!(payment.error_message.is_none());
        assert_eq!(payment.sender_account_id, sender);
        assert_eq!(payment.receiver_account_id, receiver);
    }

    #[test]
    fn test_filter_matches() {
        let sender = AccountId::new();
        let payment = Payment::create("k", sender, AccountId::new(), dec!(1), "USD");

        assert!(PaymentFilter::default().matches(&payment));
        assert!(
            PaymentFilter {
                sender_account_id: Some(sender),
                status: Some(PaymentStatus::Pending),
            }
            .matches(&payment)
        );
        assert!(
            !PaymentFilter {
                sender_account_id: None,
                status: Some(PaymentStatus::Completed),
            }
            .matches(&payment)
        );
        assert!(
            !PaymentFilter {
                sender_account_id: Some(AccountId::new()),
                status: None,
            }
            .matches(&payment)
        );
    }
}
