//! payflow - Payment Transfer Orchestration Engine
//!
//! Moves money between two ledger accounts exactly once per client
//! request, no matter how often anything retries or crashes.
//!
//! # Modules
//!
//! - [`error`] - Error codes and the engine error type
//! - [`money`] - Amount parsing and formatting
//! - [`ledger`] - Account records, pair locking and the transfer executor
//! - [`payment`] - Payment records, stores and the intake service
//! - [`saga`] - Durable workflow, retry policies, engine and recovery
//! - [`notify`] - Terminal-state notification events
//! - [`outbox`] - At-least-once delivery of outbound messages
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing setup

pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod notify;
pub mod outbox;
pub mod payment;
pub mod saga;

// Convenient re-exports at crate root
pub use error::{ErrorCode, PaymentError, RetryClass};
pub use ledger::{Account, AccountId, AccountService, LedgerStore, TransferExecutor, TransferResult};
pub use notify::{CompletionNotifier, PAYMENT_NOTIFICATIONS_TOPIC, PaymentNotification};
pub use outbox::{MessageChannel, OutboxDispatcher, OutboxRecord, OutboxStore};
pub use payment::{
    Payment, PaymentAccepted, PaymentId, PaymentRequest, PaymentService, PaymentStatus,
    PaymentStore,
};
pub use saga::{PaymentWorkflow, RecoveryWorker, RetryPolicy, SagaEngine};
