//! Payment domain: record model, durable stores and the intake surface.

pub mod memory;
pub mod model;
pub mod postgres;
pub mod service;
pub mod store;


pub use memory::InMemoryPayments;
pub use model::{
    PageRequest, PageResponse, Payment, PaymentFilter, PaymentId, PaymentStatus,
};
pub use postgres::PgPayments;
pub use service::{PaymentAccepted, PaymentRequest, PaymentService};
pub use store::PaymentStore;
