//! Data-access context.
//!
//! A [`LaundryStore`] hands out transactions ([`StoreTx`]) for the mutating
//! workflows and answers the read-only listing queries directly.
//!
//! ## Transactions
//!
//! Every workflow runs inside exactly one `StoreTx`. Guard reads that the
//! decision depends on (`lock_booking`, `lock_order`, `lock_inventory`) take
//! row locks in Postgres (`SELECT … FOR UPDATE`); the in-memory store holds a
//! single async mutex for the lifetime of the transaction instead.
//!
//! A transaction that is dropped without [`StoreTx::commit`] is rolled back.
//!
//! ## Implementations
//!
//! - [`InMemoryStore`]: tests and local development.
//! - [`PostgresStore`]: sqlx-backed production store.

mod in_memory;
mod postgres;
mod query;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use laundry_bookings::{Booking, BookingStatus, NewBooking};
use laundry_catalog::{LineItem, PackageInclude, Service};
use laundry_core::{BookingId, InventoryItemId, OrderId, ServiceId};
use laundry_customers::{Customer, NewCustomer};
use laundry_inventory::{ConsumingLine, StockAdjustment, SupplyLink};
use laundry_orders::{NewOrder, Order};

use crate::error::StoreError;

pub use in_memory::{InMemoryStore, InMemoryTx};
pub use postgres::{PostgresStore, PostgresTx};
pub use query::{
    BookingQuery, BookingView, DetailView, OrderQuery, OrderView, Page, SortOrder,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to the shop's storage.
#[async_trait]
pub trait LaundryStore: Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> StoreResult<Self::Tx>;

    async fn active_services(&self) -> StoreResult<Vec<Service>>;

    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Page<OrderView>>;

    async fn get_order(&self, order_id: OrderId) -> StoreResult<Option<OrderView>>;

    async fn list_bookings(&self, query: &BookingQuery) -> StoreResult<Page<BookingView>>;
}

/// One unit of work. Commit to keep the writes.
#[async_trait]
pub trait StoreTx: Send {
    // Customers

    async fn find_customer_by_phone(&mut self, phone_number: &str) -> StoreResult<Option<Customer>>;

    async fn insert_customer(&mut self, customer: &NewCustomer) -> StoreResult<Customer>;

    // Catalog

    /// Catalog rows whose name is one of `names` (active or not).
    async fn services_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Service>>;

    async fn services_by_ids(&mut self, ids: &[ServiceId]) -> StoreResult<Vec<Service>>;

    // Bookings

    async fn insert_booking(
        &mut self,
        customer: &Customer,
        booking: &NewBooking,
        created_at: DateTime<Utc>,
    ) -> StoreResult<BookingId>;

    async fn insert_booking_lines(&mut self, booking_id: BookingId, lines: &[LineItem]) -> StoreResult<()>;

    /// Load and lock a booking row.
    async fn lock_booking(&mut self, booking_id: BookingId) -> StoreResult<Option<Booking>>;

    async fn booking_lines(&mut self, booking_id: BookingId) -> StoreResult<Vec<LineItem>>;

    async fn set_booking_status(&mut self, booking_id: BookingId, status: BookingStatus) -> StoreResult<()>;

    // Orders

    /// Next per-day order sequence number, starting at 1.
    async fn next_order_sequence(&mut self, day: NaiveDate) -> StoreResult<u32>;

    async fn order_for_booking(&mut self, booking_id: BookingId) -> StoreResult<Option<OrderId>>;

    async fn insert_order(&mut self, order: &NewOrder) -> StoreResult<OrderId>;

    async fn insert_order_lines(&mut self, order_id: OrderId, lines: &[LineItem]) -> StoreResult<()>;

    async fn delete_order_lines(&mut self, order_id: OrderId, service_ids: &[ServiceId]) -> StoreResult<()>;

    /// Load and lock an order row.
    async fn lock_order(&mut self, order_id: OrderId) -> StoreResult<Option<Order>>;

    async fn order_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<LineItem>>;

    /// Write back the mutable columns of an order (status, amounts, completion).
    async fn save_order(&mut self, order: &Order) -> StoreResult<()>;

    // Inventory

    /// Order lines joined with their service type.
    async fn consuming_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<ConsumingLine>>;

    async fn supply_links(&mut self, service_ids: &[ServiceId]) -> StoreResult<Vec<SupplyLink>>;

    async fn package_includes(&mut self, bundle_ids: &[ServiceId]) -> StoreResult<Vec<PackageInclude>>;

    /// Lock inventory rows and return their quantity on hand.
    async fn lock_inventory(
        &mut self,
        items: &[InventoryItemId],
    ) -> StoreResult<BTreeMap<InventoryItemId, i64>>;

    async fn apply_stock_adjustment(&mut self, adjustment: &StockAdjustment) -> StoreResult<()>;

    async fn commit(self) -> StoreResult<()>;
}
