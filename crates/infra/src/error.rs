//! Error types for the data-access and workflow layers.

use thiserror::Error;

use laundry_core::DomainError;

/// Data-access failure.
///
/// Transactions that fail with any of these are rolled back.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violation (order code, booking already converted, phone).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A row disappeared between the guard read and the write.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored row could not be decoded into a domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Connection, pool or other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Failure of a workflow in [`crate::LaundryService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
