//! Terminal-state notifications: the event shape and the notifier that
//! enqueues them into the outbox.

pub mod event;
pub mod notifier;

pub use event::PaymentNotification;
pub use notifier::{CompletionNotifier, PAYMENT_NOTIFICATIONS_TOPIC};
