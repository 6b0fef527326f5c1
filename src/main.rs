//! payflow - Payment Transfer Orchestration Engine
//!
//! Daemon entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Intake  │───▶│   Saga   │───▶│  Ledger  │───▶│  Outbox  │
//! │ (dedup)  │    │ (resume) │    │ (locked) │    │ (notify) │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! This binary runs the background side of the engine: the recovery
//! worker that restarts stalled sagas and the outbox dispatcher that
//! drains completion notifications. Intake is library surface, wired in
//! by whatever transport fronts the deployment.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use payflow::config::AppConfig;
use payflow::error::PaymentError;
use payflow::ledger::{PgLedger, TransferExecutor};
use payflow::notify::CompletionNotifier;
use payflow::outbox::{MessageChannel, OutboxDispatcher, OutboxStore, PgOutbox};
use payflow::payment::{PaymentStore, PgPayments};
use payflow::saga::{InProcessEngine, PaymentWorkflow, PgSagaLog, RecoveryWorker, SagaEngine};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Stand-in channel: logs deliveries instead of talking to a broker.
/// The broker client is deployment-specific and plugs in here.
struct LogChannel;

#[async_trait]
impl MessageChannel for LogChannel {
    async fn send(&self, topic: &str, key: &str, payload: &str) -> Result<(), PaymentError> {
        tracing::info!(topic, key, payload, "Delivering notification");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env);
    let _log_guard = payflow::logging::init_logging(&app_config);

    tracing::info!("Starting payflow engine in {} mode", env);

    let postgres_url = app_config
        .postgres_url
        .clone()
        .context("postgres_url must be set in config")?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&postgres_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    let payments: Arc<dyn PaymentStore> = Arc::new(PgPayments::new(pool.clone()));
    let ledger = Arc::new(PgLedger::new(pool.clone()));
    let outbox: Arc<dyn OutboxStore> = Arc::new(PgOutbox::new(pool.clone()));
    let saga_log = Arc::new(PgSagaLog::new(pool.clone()));

    let executor = Arc::new(TransferExecutor::new(ledger, payments.clone()));
    let notifier = Arc::new(CompletionNotifier::new(payments.clone(), outbox.clone()));
    let workflow = Arc::new(PaymentWorkflow::new(executor, notifier, saga_log));
    let engine: Arc<dyn SagaEngine> = Arc::new(InProcessEngine::new(workflow));

    let recovery = RecoveryWorker::new(payments, engine, app_config.recovery_config());
    let channel: Arc<dyn MessageChannel> = Arc::new(LogChannel);
    let dispatcher = OutboxDispatcher::new(outbox, channel, app_config.dispatcher_config());

    tokio::spawn(async move { recovery.run().await });
    tokio::spawn(async move { dispatcher.run().await });

    tracing::info!("payflow engine ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received, stopping");
    Ok(())
}
