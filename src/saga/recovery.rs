//! Recovery worker.
//!
//! Periodically scans for payments stuck in a non-terminal state longer
//! than the stale threshold and restarts their sagas. Combined with the
//! idempotent executor and the saga log this turns any crash, lost task or
//! missed start signal into a bounded delay instead of a wedged payment.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::engine::SagaEngine;
use crate::error::PaymentError;
use crate::payment::PaymentStore;

#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    pub scan_interval: Duration,
    /// A non-terminal payment untouched for this long is considered stuck.
    /// Must comfortably exceed the transfer step's worst-case retry span.
    pub stale_threshold: Duration,
    pub batch_size: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(60),
            batch_size: 100,
        }
    }
}

pub struct RecoveryWorker {
    payments: Arc<dyn PaymentStore>,
    engine: Arc<dyn SagaEngine>,
    config: RecoveryConfig,
}

impl RecoveryWorker {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        engine: Arc<dyn SagaEngine>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            payments,
            engine,
            config,
        }
    }

    pub async fn run(&self) -> ! {
        info!(
            scan_interval_secs = self.config.scan_interval.as_secs(),
            stale_threshold_secs = self.config.stale_threshold.as_secs(),
            "Recovery worker started"
        );
        let mut ticker = tokio::time::interval(self.config.scan_interval);
        loop {
            ticker.tick().await;
            match self.scan_and_recover().await {
                Ok(0) => {}
                Ok(recovered) => info!(recovered, "Recovery sweep restarted stalled sagas"),
                Err(e) => warn!(error = %e, "Recovery sweep failed"),
            }
        }
    }

    /// One sweep: restart the saga of every stalled payment found.
    pub async fn scan_and_recover(&self) -> Result<usize, PaymentError> {
        let stalled = self
            .payments
            .find_stalled(self.config.stale_threshold, self.config.batch_size)
            .await?;

        let mut recovered = 0;
        for payment in stalled {
            info!(
                payment_id = %payment.id,
                status = %payment.status,
                updated_at = %payment.updated_at,
                "Restarting stalled payment saga"
            );
            self.engine.start(payment.id).await?;
            recovered += 1;
        }
        Ok(recovered)
    }
}
