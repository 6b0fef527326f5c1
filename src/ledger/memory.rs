//! In-memory ledger store.
//!
//! One async mutex per account gives the exclusive-lock semantics of the
//! relational store's `SELECT ... FOR UPDATE`; the payment store handle
//! lets `commit` couple the account writes with the payment transition the
//! way a shared database transaction would.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use super::account::{Account, AccountId};
use super::store::{AccountPairLease, LedgerStore};
use crate::error::PaymentError;
use crate::payment::{PaymentId, PaymentStatus, PaymentStore};

pub struct InMemoryLedger {
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    payments: Arc<dyn PaymentStore>,
}

impl InMemoryLedger {
    pub fn new(payments: Arc<dyn PaymentStore>) -> Self {
        Self {
            accounts: DashMap::new(),
            payments,
        }
    }

    async fn lock_one(&self, id: AccountId) -> Option<LockedSlot> {
        // Clone the Arc out of the map so the shard lock is not held while
        // we wait on the account mutex.
        let slot = self.accounts.get(&id).map(|entry| entry.value().clone())?;
        let guard = slot.lock_owned().await;
        let locked_version = guard.version;
        Some(LockedSlot {
            id,
            guard,
            locked_version,
        })
    }
}

struct LockedSlot {
    id: AccountId,
    guard: OwnedMutexGuard<Account>,
    locked_version: i64,
}

struct MemoryPairLease {
    slots: Vec<LockedSlot>,
    payments: Arc<dyn PaymentStore>,
}

#[async_trait]
impl AccountPairLease for MemoryPairLease {
    fn get(&self, id: AccountId) -> Option<Account> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| slot.guard.clone())
    }

    async fn commit(
        mut self: Box<Self>,
        accounts: Vec<Account>,
        payment_id: PaymentId,
    ) -> Result<bool, PaymentError> {
        // Validate every write against the version captured at lock time
        // before anything is applied.
        for account in &accounts {
            let slot = self
                .slots
                .iter()
                .find(|slot| slot.id == account.id)
                .ok_or_else(|| {
                    PaymentError::Internal(format!(
                        "commit for account {} outside the held lease",
                        account.id
                    ))
                })?;
            if slot.guard.version != slot.locked_version {
                return Err(PaymentError::VersionConflict(account.id.inner()));
            }
        }

        // The payment transition gates the whole unit: if the payment left
        // PROCESSING, a completed run already owns the effects.
        let flipped = self
            .payments
            .update_status_if(payment_id, PaymentStatus::Processing, PaymentStatus::Completed)
            .await?;
        if !flipped {
            warn!(payment_id = %payment_id, "payment no longer PROCESSING at commit, dropping writes");
            return Ok(false);
        }

        let now = Utc::now();
        for account in accounts {
            let slot = self
                .slots
                .iter_mut()
                .find(|slot| slot.id == account.id)
                .expect("validated above");
            let mut updated = account;
            updated.version = slot.locked_version + 1;
            updated.updated_at = now;
            *slot.guard = updated;
        }

        Ok(true)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn insert_account(&self, account: Account) -> Result<(), PaymentError> {
        use dashmap::mapref::entry::Entry;
        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => Err(PaymentError::Store(format!(
                "account already exists: {}",
                account.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(account)));
                Ok(())
            }
        }
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, PaymentError> {
        let slot = match self.accounts.get(&id).map(|entry| entry.value().clone()) {
            Some(slot) => slot,
            None => return Ok(None),
        };
        Ok(Some(slot.lock().await.clone()))
    }

    async fn lock_pair(
        &self,
        first: AccountId,
        second: AccountId,
    ) -> Result<Box<dyn AccountPairLease>, PaymentError> {
        let mut slots = Vec::with_capacity(2);
        if let Some(slot) = self.lock_one(first).await {
            slots.push(slot);
        }
        if second != first
            && let Some(slot) = self.lock_one(second).await
        {
            slots.push(slot);
        }
        Ok(Box::new(MemoryPairLease {
            slots,
            payments: self.payments.clone(),
        }))
    }
}
