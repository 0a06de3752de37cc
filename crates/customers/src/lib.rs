//! Customers domain module.
//!
//! Customers are keyed by phone number and created lazily the first time a
//! booking arrives from that number.

pub mod customer;

pub use customer::{Customer, CustomerResolution, NewCustomer, normalize_phone};
