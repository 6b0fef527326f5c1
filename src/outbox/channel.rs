//! Outbound message channel seam.
//!
//! The dispatcher only ever talks to this trait; the broker behind it is
//! deployment detail. The in-memory channel doubles as the test double,
//! with failure injection for delivery-retry scenarios.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::PaymentError;

#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Deliver one message. Returning `Ok` confirms the broker accepted it;
    /// any error leaves the message eligible for redelivery.
    async fn send(&self, topic: &str, key: &str, payload: &str) -> Result<(), PaymentError>;
}

/// A delivered message, as observed by the in-memory channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub topic: String,
    pub key: String,
    pub payload: String,
}

#[derive(Default)]
pub struct InMemoryChannel {
    sent: Mutex<Vec<SentMessage>>,
    fail_times: AtomicU32,
    send_count: AtomicU64,
    fail_count: AtomicU64,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` sends fail with a channel error.
    pub fn set_fail_times(&self, n: u32) {
        self.fail_times.store(n, Ordering::SeqCst);
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn fail_count(&self) -> u64 {
        self.fail_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn send(&self, topic: &str, key: &str, payload: &str) -> Result<(), PaymentError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_times.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_times.store(remaining - 1, Ordering::SeqCst);
            self.fail_count.fetch_add(1, Ordering::SeqCst);
            return Err(PaymentError::Channel("injected send failure".into()));
        }

        self.sent.lock().unwrap().push(SentMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_injection_then_recovery() {
        let channel = InMemoryChannel::new();
        channel.set_fail_times(2);

        assert!(channel.send("t", "k", "p").await.is_err());
        assert!(channel.send("t", "k", "p").await.is_err());
        assert!(channel.send("t", "k", "p").await.is_ok());

        assert_eq!(channel.send_count(), 3);
        assert_eq!(channel.fail_count(), 2);
        assert_eq!(channel.sent_messages().len(), 1);
    }
}
