//! Service catalog domain module.
//!
//! Catalog entries (main services, add-on supplies, bundle packages), the
//! bundle → inventory mapping, line items with their price snapshot, and the
//! name-based selection used by bookings and walk-in orders. Pure domain
//! logic: no IO, no HTTP, no storage.

pub mod line;
pub mod selection;
pub mod service;

pub use line::{LineItem, lines_total};
pub use selection::{PricedSelection, ServiceSelection, SupplyRequest};
pub use service::{PackageInclude, Service, ServiceType};
