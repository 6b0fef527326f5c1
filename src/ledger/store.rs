//! Ledger store contract.
//!
//! The store owns account records exclusively; all mutation flows through
//! the transfer executor holding an [`AccountPairLease`].

use async_trait::async_trait;

use super::account::{Account, AccountId};
use crate::error::PaymentError;
use crate::payment::PaymentId;

/// Exclusive lease over a pair of account rows.
///
/// Acquired via [`LedgerStore::lock_pair`]; the locks are held until the
/// lease is consumed or dropped. Either slot may be empty when the account
/// does not exist.
#[async_trait]
pub trait AccountPairLease: Send {
    /// Snapshot of a locked account, if it exists.
    fn get(&self, id: AccountId) -> Option<Account>;

    /// Persist the mutated accounts and flip the payment PROCESSING ->
    /// COMPLETED as one atomic unit: either all writes land or none do.
    ///
    /// Each account write is conditioned on the version captured at lock
    /// time; a mismatch means something bypassed the transfer path and is
    /// surfaced as [`PaymentError::VersionConflict`].
    ///
    /// Returns `false` (with no writes applied) when the payment is no
    /// longer PROCESSING - a stale invocation losing the race to a
    /// completed run.
    async fn commit(
        self: Box<Self>,
        accounts: Vec<Account>,
        payment_id: PaymentId,
    ) -> Result<bool, PaymentError>;
}

/// Durable, versioned account storage.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_account(&self, account: Account) -> Result<(), PaymentError>;

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, PaymentError>;

    async fn exists(&self, id: AccountId) -> Result<bool, PaymentError> {
        Ok(self.find_account(id).await?.is_some())
    }

    /// Block until exclusive access to both accounts is granted, acquiring
    /// them strictly in the order given.
    ///
    /// Callers must order the pair with [`super::lock_order`] first; passing
    /// an unordered pair reintroduces the deadlock this exists to prevent.
    async fn lock_pair(
        &self,
        first: AccountId,
        second: AccountId,
    ) -> Result<Box<dyn AccountPairLease>, PaymentError>;
}
