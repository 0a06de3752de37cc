use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use laundry_bookings::{Booking, BookingStatus, NewBooking};
use laundry_catalog::{LineItem, PackageInclude, Service, ServiceType};
use laundry_core::{BookingId, CustomerId, InventoryItemId, OrderId, ServiceId};
use laundry_customers::{Customer, NewCustomer};
use laundry_inventory::{ConsumingLine, InventoryItem, StockAdjustment, SupplyLink};
use laundry_orders::{NewOrder, Order};

use super::query::{BookingQuery, BookingView, DetailView, OrderQuery, OrderView, Page, SortOrder};
use super::{LaundryStore, StoreResult, StoreTx};
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
struct State {
    customers: BTreeMap<CustomerId, Customer>,
    services: BTreeMap<ServiceId, Service>,
    inventory: BTreeMap<InventoryItemId, InventoryItem>,
    package_includes: Vec<PackageInclude>,
    bookings: BTreeMap<BookingId, Booking>,
    booking_lines: BTreeMap<BookingId, Vec<LineItem>>,
    orders: BTreeMap<OrderId, Order>,
    order_lines: BTreeMap<OrderId, Vec<LineItem>>,
    order_counters: BTreeMap<NaiveDate, u32>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn details(&self, lines: &[LineItem]) -> Vec<DetailView> {
        lines
            .iter()
            .map(|line| {
                let (name, service_type) = self
                    .services
                    .get(&line.service_id)
                    .map(|s| (s.service_name.clone(), s.service_type))
                    .unwrap_or_else(|| (String::new(), ServiceType::MainService));
                DetailView::new(line, name, service_type)
            })
            .collect()
    }

    fn order_view(&self, order: &Order) -> OrderView {
        let customer = order.customer_id.and_then(|id| self.customers.get(&id));
        let lines = self.order_lines.get(&order.order_id).map(Vec::as_slice).unwrap_or(&[]);
        OrderView::new(
            order.clone(),
            customer.map(|c| c.name.clone()),
            customer.map(|c| c.phone_number.clone()),
            self.details(lines),
        )
    }
}

fn sorted<'a, T, K: Ord>(mut rows: Vec<&'a T>, order: SortOrder, key: impl Fn(&T) -> K) -> Vec<&'a T> {
    rows.sort_by(|a, b| key(*a).cmp(&key(*b)));
    if order == SortOrder::Desc {
        rows.reverse();
    }
    rows
}

fn paginate<T>(rows: Vec<T>, page: u32, limit: u32, offset: u64) -> Page<T> {
    let total = rows.len() as u64;
    let data = rows
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect();
    Page::new(page, limit, total, data)
}

/// In-memory store.
///
/// Intended for tests/dev. Transactions are serialised by one async mutex and
/// work on a copy of the state that replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog entry. The id is assigned by the store.
    pub async fn seed_service(
        &self,
        service_name: &str,
        price: laundry_core::Money,
        service_type: ServiceType,
    ) -> ServiceId {
        let mut state = self.state.lock().await;
        let service_id = ServiceId::new(state.next_id());
        state.services.insert(
            service_id,
            Service {
                service_id,
                service_name: service_name.to_string(),
                price,
                unit_type: None,
                service_type,
                description: None,
                is_active: true,
            },
        );
        service_id
    }

    pub async fn deactivate_service(&self, service_id: ServiceId) {
        if let Some(service) = self.state.lock().await.services.get_mut(&service_id) {
            service.is_active = false;
        }
    }

    /// Add a stocked item, optionally sold 1:1 as the given add-on supply.
    pub async fn seed_inventory_item(
        &self,
        item_name: &str,
        quantity: i64,
        service_id: Option<ServiceId>,
    ) -> InventoryItemId {
        let mut state = self.state.lock().await;
        let item_id = InventoryItemId::new(state.next_id());
        state.inventory.insert(
            item_id,
            InventoryItem {
                item_id,
                item_name: item_name.to_string(),
                quantity,
                service_id,
            },
        );
        item_id
    }

    pub async fn seed_package_include(&self, include: PackageInclude) {
        self.state.lock().await.package_includes.push(include);
    }

    pub async fn inventory_item(&self, item_id: InventoryItemId) -> Option<InventoryItem> {
        self.state.lock().await.inventory.get(&item_id).cloned()
    }

    pub async fn booking(&self, booking_id: BookingId) -> Option<Booking> {
        self.state.lock().await.bookings.get(&booking_id).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl LaundryStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> StoreResult<InMemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx { guard, working })
    }

    async fn active_services(&self) -> StoreResult<Vec<Service>> {
        let state = self.state.lock().await;
        Ok(state.services.values().filter(|s| s.is_active).cloned().collect())
    }

    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Page<OrderView>> {
        let state = self.state.lock().await;
        let matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| {
                let customer = o.customer_id.and_then(|id| state.customers.get(&id));
                query.matches(
                    o,
                    customer.map(|c| c.name.as_str()),
                    customer.map(|c| c.phone_number.as_str()),
                )
            })
            .collect();
        let rows: Vec<OrderView> = sorted(matching, query.order, |o| (o.created_at, o.order_id))
            .into_iter()
            .map(|o| state.order_view(o))
            .collect();
        Ok(paginate(rows, query.page, query.limit, query.offset()))
    }

    async fn get_order(&self, order_id: OrderId) -> StoreResult<Option<OrderView>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&order_id).map(|o| state.order_view(o)))
    }

    async fn list_bookings(&self, query: &BookingQuery) -> StoreResult<Page<BookingView>> {
        let state = self.state.lock().await;
        let matching: Vec<&Booking> = state.bookings.values().filter(|b| query.matches(b)).collect();
        let mut rows = Vec::with_capacity(matching.len());
        for booking in sorted(matching, query.order, |b| (b.created_at, b.booking_id)) {
            let customer = state.customers.get(&booking.customer_id).ok_or_else(|| {
                StoreError::Corrupt(format!("booking {} has no customer", booking.booking_id))
            })?;
            let lines = state.booking_lines.get(&booking.booking_id).map(Vec::as_slice).unwrap_or(&[]);
            rows.push(BookingView {
                booking: booking.clone(),
                name: customer.name.clone(),
                phone_number: customer.phone_number.clone(),
                email: customer.email.clone(),
                address: customer.address.clone(),
                details: state.details(lines),
                total_amount: lines.iter().map(LineItem::line_total).sum(),
            });
        }
        Ok(paginate(rows, query.page, query.limit, query.offset()))
    }
}

/// Transaction over [`InMemoryStore`]; holds the store lock until dropped.
pub struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
}

impl std::fmt::Debug for InMemoryTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTx").finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn find_customer_by_phone(&mut self, phone_number: &str) -> StoreResult<Option<Customer>> {
        Ok(self
            .working
            .customers
            .values()
            .find(|c| c.phone_number == phone_number)
            .cloned())
    }

    async fn insert_customer(&mut self, customer: &NewCustomer) -> StoreResult<Customer> {
        if self.working.customers.values().any(|c| c.phone_number == customer.phone_number) {
            return Err(StoreError::Conflict(format!(
                "customer with phone {} already exists",
                customer.phone_number
            )));
        }
        let customer_id = CustomerId::new(self.working.next_id());
        let stored = Customer {
            customer_id,
            name: customer.name.clone(),
            phone_number: customer.phone_number.clone(),
            email: customer.email.clone(),
            address: customer.address.clone(),
        };
        self.working.customers.insert(customer_id, stored.clone());
        Ok(stored)
    }

    async fn services_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Service>> {
        Ok(self
            .working
            .services
            .values()
            .filter(|s| names.contains(&s.service_name))
            .cloned()
            .collect())
    }

    async fn services_by_ids(&mut self, ids: &[ServiceId]) -> StoreResult<Vec<Service>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.services.get(id))
            .cloned()
            .collect())
    }

    async fn insert_booking(
        &mut self,
        customer: &Customer,
        booking: &NewBooking,
        created_at: DateTime<Utc>,
    ) -> StoreResult<BookingId> {
        let booking_id = BookingId::new(self.working.next_id());
        self.working.bookings.insert(
            booking_id,
            Booking {
                booking_id,
                customer_id: customer.customer_id,
                pickup_date: booking.pickup_date,
                payment_type: booking.payment_type.clone(),
                special_instruction: booking.special_instruction.clone(),
                status: BookingStatus::Pending,
                created_at,
            },
        );
        Ok(booking_id)
    }

    async fn insert_booking_lines(&mut self, booking_id: BookingId, lines: &[LineItem]) -> StoreResult<()> {
        self.working
            .booking_lines
            .entry(booking_id)
            .or_default()
            .extend_from_slice(lines);
        Ok(())
    }

    async fn lock_booking(&mut self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        Ok(self.working.bookings.get(&booking_id).cloned())
    }

    async fn booking_lines(&mut self, booking_id: BookingId) -> StoreResult<Vec<LineItem>> {
        Ok(self.working.booking_lines.get(&booking_id).cloned().unwrap_or_default())
    }

    async fn set_booking_status(&mut self, booking_id: BookingId, status: BookingStatus) -> StoreResult<()> {
        let booking = self
            .working
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {booking_id}")))?;
        booking.status = status;
        Ok(())
    }

    async fn next_order_sequence(&mut self, day: NaiveDate) -> StoreResult<u32> {
        let seq = self.working.order_counters.entry(day).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn order_for_booking(&mut self, booking_id: BookingId) -> StoreResult<Option<OrderId>> {
        Ok(self
            .working
            .orders
            .values()
            .find(|o| o.booking_id == Some(booking_id))
            .map(|o| o.order_id))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> StoreResult<OrderId> {
        if self.working.orders.values().any(|o| o.order_code == order.order_code) {
            return Err(StoreError::Conflict(format!("order code {} already exists", order.order_code)));
        }
        if let Some(booking_id) = order.booking_id {
            if self.working.orders.values().any(|o| o.booking_id == Some(booking_id)) {
                return Err(StoreError::Conflict(format!("booking {booking_id} already has an order")));
            }
        }
        let order_id = OrderId::new(self.working.next_id());
        self.working.orders.insert(order_id, order.clone().into_order(order_id));
        Ok(order_id)
    }

    async fn insert_order_lines(&mut self, order_id: OrderId, lines: &[LineItem]) -> StoreResult<()> {
        self.working
            .order_lines
            .entry(order_id)
            .or_default()
            .extend_from_slice(lines);
        Ok(())
    }

    async fn delete_order_lines(&mut self, order_id: OrderId, service_ids: &[ServiceId]) -> StoreResult<()> {
        if let Some(lines) = self.working.order_lines.get_mut(&order_id) {
            lines.retain(|l| !service_ids.contains(&l.service_id));
        }
        Ok(())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn order_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<LineItem>> {
        Ok(self.working.order_lines.get(&order_id).cloned().unwrap_or_default())
    }

    async fn save_order(&mut self, order: &Order) -> StoreResult<()> {
        let stored = self
            .working
            .orders
            .get_mut(&order.order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order.order_id)))?;
        stored.status = order.status;
        stored.payment_status = order.payment_status;
        stored.paid_amount = order.paid_amount;
        stored.total_amount = order.total_amount;
        stored.completion_date = order.completion_date;
        Ok(())
    }

    async fn consuming_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<ConsumingLine>> {
        let lines = self.working.order_lines.get(&order_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(lines
            .iter()
            .filter_map(|line| {
                self.working.services.get(&line.service_id).map(|s| ConsumingLine {
                    service_id: line.service_id,
                    service_type: s.service_type,
                    quantity: line.quantity,
                })
            })
            .collect())
    }

    async fn supply_links(&mut self, service_ids: &[ServiceId]) -> StoreResult<Vec<SupplyLink>> {
        Ok(self
            .working
            .inventory
            .values()
            .filter_map(|item| {
                item.service_id
                    .filter(|sid| service_ids.contains(sid))
                    .map(|service_id| SupplyLink {
                        service_id,
                        inventory_item_id: item.item_id,
                    })
            })
            .collect())
    }

    async fn package_includes(&mut self, bundle_ids: &[ServiceId]) -> StoreResult<Vec<PackageInclude>> {
        Ok(self
            .working
            .package_includes
            .iter()
            .filter(|p| bundle_ids.contains(&p.bundle_service_id))
            .copied()
            .collect())
    }

    async fn lock_inventory(
        &mut self,
        items: &[InventoryItemId],
    ) -> StoreResult<BTreeMap<InventoryItemId, i64>> {
        Ok(items
            .iter()
            .filter_map(|id| self.working.inventory.get(id).map(|i| (*id, i.quantity)))
            .collect())
    }

    async fn apply_stock_adjustment(&mut self, adjustment: &StockAdjustment) -> StoreResult<()> {
        let item = self
            .working
            .inventory
            .get_mut(&adjustment.item_id)
            .ok_or_else(|| StoreError::NotFound(format!("inventory item {}", adjustment.item_id)))?;
        item.quantity -= adjustment.deducted;
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}
