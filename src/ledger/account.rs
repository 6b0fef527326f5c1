//! Account record and balance invariants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PaymentError;

/// Opaque account identifier.
///
/// `Ord` matters here: lock acquisition order is defined by comparing ids,
/// see [`crate::ledger::lock_order`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a new unique AccountId.
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

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Durable account record, owned by the ledger store.
///
/// The balance is an exact decimal and never goes negative; every mutation
/// bumps `version`, and every store write is conditioned on the version read
/// at lock time so out-of-band writes fail loudly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Decimal,
    pub currency: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, balance: Decimal, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            balance,
            currency: currency.into(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Subtract `amount` from the balance.
    ///
    /// Fails when the balance cannot cover the amount; the check and the
    /// subtraction are only meaningful under the store's exclusive lock.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), PaymentError> {
        if self.balance < amount {
            return Err(PaymentError::InsufficientBalance {
                account: self.id.inner(),
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Add `amount` to the balance. Cannot fail - there is no upper bound.
    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
    }
}
