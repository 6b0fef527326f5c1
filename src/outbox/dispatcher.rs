//! Outbox dispatcher.
//!
//! Polls the outbox for due records and pushes them over the message
//! channel. The attempt is persisted before the send, and only a confirmed
//! send completes the record, so delivery is at-least-once and unconfirmed
//! records come back around after the resubmit window.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::channel::MessageChannel;
use super::store::OutboxStore;
use crate::error::PaymentError;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub poll_interval: Duration,
    /// How long an attempted record stays off the dispatch list before it
    /// is considered lost and resubmitted.
    pub resubmit_after: Duration,
    pub batch_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            resubmit_after: Duration::from_secs(60),
            batch_size: 100,
        }
    }
}

pub struct OutboxDispatcher {
    outbox: Arc<dyn OutboxStore>,
    channel: Arc<dyn MessageChannel>,
    config: DispatcherConfig,
}

impl OutboxDispatcher {
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        channel: Arc<dyn MessageChannel>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            outbox,
            channel,
            config,
        }
    }

    pub async fn run(&self) -> ! {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            resubmit_after_secs = self.config.resubmit_after.as_secs(),
            "Outbox dispatcher started"
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.dispatch_due().await {
                warn!(error = %e, "Outbox dispatch sweep failed");
            }
        }
    }

    /// Dispatch every due record once. Returns the number delivered.
    pub async fn dispatch_due(&self) -> Result<usize, PaymentError> {
        let due = self
            .outbox
            .fetch_pending(self.config.resubmit_after, self.config.batch_size)
            .await?;

        let mut delivered = 0;
        for record in due {
            // Attempt goes to the store first: a crash between here and the
            // send is indistinguishable from a lost confirmation, and both
            // are repaired by resubmission.
            self.outbox.mark_attempted(record.id).await?;

            match self
                .channel
                .send(&record.topic, &record.partition_key, &record.payload)
                .await
            {
                Ok(()) => {
                    self.outbox.mark_completed(record.id).await?;
                    debug!(
                        outbox_id = %record.id,
                        topic = record.topic,
                        key = record.partition_key,
                        "Outbox record delivered"
                    );
                    delivered += 1;
                }
                Err(e) => {
                    warn!(
                        outbox_id = %record.id,
                        topic = record.topic,
                        attempts = record.attempts + 1,
                        error = %e,
                        "Outbox send failed, will resubmit"
                    );
                }
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::record::{OutboxRecord, OutboxStatus};
    use crate::outbox::store::InMemoryOutbox;

    fn dispatcher(
        resubmit_after: Duration,
    ) -> (OutboxDispatcher, Arc<InMemoryOutbox>, Arc<crate::outbox::channel::InMemoryChannel>) {
        let outbox = Arc::new(InMemoryOutbox::new());
        let channel = Arc::new(crate::outbox::channel::InMemoryChannel::new());
        let dispatcher = OutboxDispatcher::new(
            outbox.clone(),
            channel.clone(),
            DispatcherConfig {
                resubmit_after,
                ..DispatcherConfig::default()
            },
        );
        (dispatcher, outbox, channel)
    }

    #[tokio::test]
    async fn test_delivers_and_completes() {
        let (dispatcher, outbox, channel) = dispatcher(Duration::from_secs(60));
        let record = OutboxRecord::new("payments", "p-1", "hello");
        let id = record.id;
        outbox.append(record).await.unwrap();

        assert_eq!(dispatcher.dispatch_due().await.unwrap(), 1);
        assert_eq!(outbox.get(id).unwrap().status, OutboxStatus::Completed);
        assert_eq!(channel.sent_messages().len(), 1);

        // Completed records are not picked up again.
        assert_eq!(dispatcher.dispatch_due().await.unwrap(), 0);
        assert_eq!(channel.send_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_send_is_resubmitted() {
        let (dispatcher, outbox, channel) = dispatcher(Duration::from_millis(0));
        let record = OutboxRecord::new("payments", "p-1", "hello");
        let id = record.id;
        outbox.append(record).await.unwrap();
        channel.set_fail_times(1);

        // First sweep: attempt recorded, send fails, record stays pending.
        assert_eq!(dispatcher.dispatch_due().await.unwrap(), 0);
        let stored = outbox.get(id).unwrap();
        assert_eq!(stored.status, OutboxStatus::Pending);
        assert_eq!(stored.attempts, 1);

        // Second sweep delivers it.
        assert_eq!(dispatcher.dispatch_due().await.unwrap(), 1);
        assert_eq!(outbox.get(id).unwrap().status, OutboxStatus::Completed);
        assert_eq!(outbox.get(id).unwrap().attempts, 2);
        assert_eq!(channel.sent_messages().len(), 1);
    }
}
