//! Durable saga machinery: step log, retry policies, the payment workflow
//! itself, the engine that runs it and the recovery sweep that restarts it.

pub mod engine;
pub mod log;
pub mod recovery;
pub mod retry;
pub mod workflow;

pub use engine::{InProcessEngine, SagaEngine};
pub use log::{InMemorySagaLog, PgSagaLog, SagaLogStore};
pub use recovery::{RecoveryConfig, RecoveryWorker};
pub use retry::{RetryPolicy, run_step};
pub use workflow::PaymentWorkflow;
