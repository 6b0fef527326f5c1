//! Account lookup and creation surface.
//!
//! Thin by design: account creation policy is out of scope, this only
//! covers what wiring and tests need to seed and inspect the ledger.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use super::account::{Account, AccountId};
use super::store::LedgerStore;
use crate::error::PaymentError;

pub struct AccountService {
    ledger: Arc<dyn LedgerStore>,
}

impl AccountService {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    pub async fn create_account(
        &self,
        initial_balance: Decimal,
        currency: &str,
    ) -> Result<Account, PaymentError> {
        if initial_balance < Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(initial_balance.to_string()));
        }

        let account = Account::new(AccountId::new(), initial_balance, currency);
        self.ledger.insert_account(account.clone()).await?;
        info!(account_id = %account.id, balance = %account.balance, "Account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, PaymentError> {
        self.ledger
            .find_account(id)
            .await?
            .ok_or(PaymentError::AccountNotFound(id.inner()))
    }
}
