//! Infrastructure layer: storage, configuration and the transactional
//! workflows built on top of them.

pub mod config;
pub mod error;
pub mod service;
pub mod store;


pub use config::{AppConfig, ConfigError, DatabaseConfig, WorkflowSettings};
pub use error::{ServiceError, ServiceResult, StoreError};
pub use service::{
    BookingReceipt, Clock, CreatedOrder, EditOutcome, FixedClock, LaundryService, PaymentOutcome,
    StatusChange, SystemClock,
};
pub use store::{InMemoryStore, LaundryStore, PostgresStore, StoreTx};
