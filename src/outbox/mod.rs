//! Transactional outbox: durable records, the channel seam and the
//! dispatcher that drains one into the other.

pub mod channel;
pub mod dispatcher;
pub mod postgres;
pub mod record;
pub mod store;

pub use channel::{InMemoryChannel, MessageChannel, SentMessage};
pub use dispatcher::{DispatcherConfig, OutboxDispatcher};
pub use postgres::PgOutbox;
pub use record::{OutboxRecord, OutboxStatus};
pub use store::{InMemoryOutbox, OutboxStore};
