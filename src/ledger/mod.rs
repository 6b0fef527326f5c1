//! Ledger: durable, versioned account records and the transfer executor.
//!
//! The store owns account rows exclusively; the executor is the only
//! component that mutates balances, always under an exclusive pair lock
//! acquired in deterministic id order.

pub mod account;
pub mod executor;
pub mod lock_order;
pub mod memory;
pub mod postgres;
pub mod service;
pub mod store;

pub use account::{Account, AccountId};
pub use executor::{TransferExecutor, TransferResult};
pub use lock_order::lock_order;
pub use memory::InMemoryLedger;
pub use postgres::PgLedger;
pub use service::AccountService;
pub use store::{AccountPairLease, LedgerStore};
