//! Transactional workflows.
//!
//! `LaundryService` is the application layer between the HTTP handlers and
//! the store. Each mutating method runs as exactly one store transaction:
//!
//! ```text
//! begin → guard read (locked) → domain decision → writes → commit
//! ```
//!
//! Any error returned before `commit` drops the transaction, which rolls it
//! back. Business decisions live in the domain crates; this module only
//! sequences reads and writes around them.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use laundry_bookings::NewBooking;
use laundry_catalog::{LineItem, PricedSelection, Service, ServiceSelection, lines_total};
use laundry_core::{BookingId, CustomerId, DomainError, Money, OrderId, ServiceId};
use laundry_customers::CustomerResolution;
use laundry_inventory::{DrawDown, StockAdjustment};
use laundry_orders::{
    NewOrder, OrderCode, OrderStatus, PaymentStatus, TransitionEffect, WalkInOrder, plan_edit, shop_date,
};

use crate::config::WorkflowSettings;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{BookingQuery, BookingView, LaundryStore, OrderQuery, OrderView, Page, StoreTx};

/// Source of "now" for timestamps and order-code dates.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant (tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingReceipt {
    pub booking_id: BookingId,
    pub customer_id: CustomerId,
    pub new_customer: bool,
    /// Requested service names with no active catalog entry.
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub order_code: OrderCode,
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub payment_status: PaymentStatus,
    pub adjustments: Vec<StockAdjustment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub order_id: OrderId,
    pub total_amount: Money,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub order_id: OrderId,
    pub payment_status: PaymentStatus,
    pub paid_amount: Money,
}

pub struct LaundryService<S> {
    store: S,
    settings: WorkflowSettings,
    clock: Arc<dyn Clock>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for LaundryService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaundryService")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<S: LaundryStore> LaundryService<S> {
    pub fn new(store: S, settings: WorkflowSettings) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, settings: WorkflowSettings, clock: Arc<dyn Clock>) -> Self {
        Self { store, settings, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    async fn next_order_code(&self, tx: &mut S::Tx, now: DateTime<Utc>) -> ServiceResult<OrderCode> {
        let day = shop_date(now, self.settings.utc_offset);
        let sequence = tx.next_order_sequence(day).await?;
        Ok(OrderCode::format(day, sequence)?)
    }

    async fn price_selection(&self, tx: &mut S::Tx, selection: &ServiceSelection) -> ServiceResult<PricedSelection> {
        let names = selection.requested_names();
        let catalog = if names.is_empty() {
            Vec::new()
        } else {
            tx.services_by_names(&names).await?
        };
        let priced = selection.price(&catalog);
        if !priced.unresolved.is_empty() {
            warn!(unresolved = ?priced.unresolved, "skipping services with no active catalog entry");
        }
        Ok(priced)
    }

    /// Record a customer booking, creating the customer on first contact.
    #[instrument(skip(self, booking), fields(phone = %booking.customer.phone_number), err)]
    pub async fn submit_booking(&self, booking: NewBooking) -> ServiceResult<BookingReceipt> {
        let booking = booking.validated()?;
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let existing = tx.find_customer_by_phone(&booking.customer.phone_number).await?;
        let (customer, new_customer) = match CustomerResolution::decide(existing, booking.customer.clone()) {
            CustomerResolution::Existing(customer) => (customer, false),
            CustomerResolution::Create(submitted) => (tx.insert_customer(&submitted).await?, true),
        };

        let booking_id = tx.insert_booking(&customer, &booking, now).await?;
        let priced = self.price_selection(&mut tx, &booking.selection).await?;
        lines_total(&priced.lines)?;
        tx.insert_booking_lines(booking_id, &priced.lines).await?;
        tx.commit().await?;

        info!(
            booking_id = %booking_id,
            customer_id = %customer.customer_id,
            new_customer,
            lines = priced.lines.len(),
            "booking submitted"
        );
        Ok(BookingReceipt {
            booking_id,
            customer_id: customer.customer_id,
            new_customer,
            unresolved: priced.unresolved,
        })
    }

    /// Accept a booking and convert it into a Stand By order.
    #[instrument(skip(self), err)]
    pub async fn accept_booking(&self, booking_id: BookingId) -> ServiceResult<CreatedOrder> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("booking {booking_id} not found")))?;
        let lines = tx.booking_lines(booking_id).await?;
        let total = lines_total(&lines)?;
        let order_code = self.next_order_code(&mut tx, now).await?;

        booking.accept()?;
        tx.set_booking_status(booking_id, booking.status).await?;

        if let Some(existing) = tx.order_for_booking(booking_id).await? {
            warn!(booking_id = %booking_id, order_id = %existing, "booking already converted");
            return Err(DomainError::conflict(format!(
                "booking {booking_id} already has order {existing}"
            ))
            .into());
        }

        let new_order = NewOrder::from_booking(&booking, order_code.clone(), total, now);
        let order_id = tx.insert_order(&new_order).await?;
        tx.insert_order_lines(order_id, &lines).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, order_id = %order_id, order_code = %order_code, total = %total, "booking accepted");
        Ok(CreatedOrder {
            order_id,
            order_code,
            total_amount: total,
        })
    }

    #[instrument(skip(self), err)]
    pub async fn decline_booking(&self, booking_id: BookingId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        let mut booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("booking {booking_id} not found")))?;

        booking.decline()?;
        tx.set_booking_status(booking_id, booking.status).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, "booking declined");
        Ok(())
    }

    /// Create a walk-in order priced from the active catalog.
    #[instrument(skip(self, order), fields(guest = %order.guest_name), err)]
    pub async fn create_walk_in(&self, order: WalkInOrder) -> ServiceResult<CreatedOrder> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let order_code = self.next_order_code(&mut tx, now).await?;
        let priced = self.price_selection(&mut tx, &order.selection).await?;
        let total = lines_total(&priced.lines)?;
        let new_order = order.into_new_order(order_code.clone(), total, now)?;

        let order_id = tx.insert_order(&new_order).await?;
        tx.insert_order_lines(order_id, &priced.lines).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            order_code = %order_code,
            total = %total,
            payment_status = %new_order.payment_status,
            "walk-in order created"
        );
        Ok(CreatedOrder {
            order_id,
            order_code,
            total_amount: total,
        })
    }

    /// Move an order through its lifecycle, applying the transition's side effects.
    #[instrument(skip(self), err)]
    pub async fn update_status(&self, order_id: OrderId, to: OrderStatus) -> ServiceResult<StatusChange> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;
        let from = order.status;

        let effect = order.transition(to, now).inspect_err(|e| {
            warn!(order_id = %order_id, from = %from, to = %to, reason = e.message(), "status change rejected");
        })?;

        let adjustments = match effect {
            TransitionEffect::DrawInventory => self.draw_inventory(&mut tx, order_id).await?,
            _ => Vec::new(),
        };

        tx.save_order(&order).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            from = %from,
            to = %to,
            payment_status = %order.payment_status,
            "order status changed"
        );
        Ok(StatusChange {
            order_id,
            from,
            to,
            payment_status: order.payment_status,
            adjustments,
        })
    }

    async fn draw_inventory(&self, tx: &mut S::Tx, order_id: OrderId) -> ServiceResult<Vec<StockAdjustment>> {
        let lines = tx.consuming_lines(order_id).await?;
        let service_ids: Vec<ServiceId> = lines
            .iter()
            .map(|l| l.service_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if service_ids.is_empty() {
            return Ok(Vec::new());
        }

        let links = tx.supply_links(&service_ids).await?;
        let includes = tx.package_includes(&service_ids).await?;
        let draw = DrawDown::compute(&lines, &links, &includes)?;
        if draw.is_empty() {
            return Ok(Vec::new());
        }

        let items: Vec<_> = draw.items().collect();
        let on_hand = tx.lock_inventory(&items).await?;
        let adjustments = self.settings.stock_policy.plan(&draw, &on_hand)?;

        for adjustment in &adjustments {
            tx.apply_stock_adjustment(adjustment).await?;
            info!(
                order_id = %order_id,
                item_id = %adjustment.item_id,
                required = adjustment.required,
                deducted = adjustment.deducted,
                on_hand_after = adjustment.on_hand_after(),
                "inventory drawn down"
            );
        }
        Ok(adjustments)
    }

    /// Replace line items on a Stand By order and recompute its total.
    #[instrument(skip(self, submitted), fields(lines = submitted.len()), err)]
    pub async fn edit_order(&self, order_id: OrderId, submitted: Vec<LineItem>) -> ServiceResult<EditOutcome> {
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;
        let current = tx.order_lines(order_id).await?;
        let plan = plan_edit(&order, &current, &submitted)?;

        let wanted: Vec<ServiceId> = plan.inserted.iter().map(|l| l.service_id).collect();
        if !wanted.is_empty() {
            let known: Vec<Service> = tx.services_by_ids(&wanted).await?;
            if let Some(missing) = wanted.iter().find(|id| !known.iter().any(|s| s.service_id == **id)) {
                return Err(DomainError::not_found(format!("service {missing} not found")).into());
            }
        }

        tx.delete_order_lines(order_id, &plan.replaced).await?;
        tx.insert_order_lines(order_id, &plan.inserted).await?;
        order.apply_edit(&plan);
        tx.save_order(&order).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            total = %order.total_amount,
            payment_status = %order.payment_status,
            "order edited"
        );
        Ok(EditOutcome {
            order_id,
            total_amount: order.total_amount,
            payment_status: order.payment_status,
        })
    }

    #[instrument(skip(self), err)]
    pub async fn update_payment(
        &self,
        order_id: OrderId,
        requested: PaymentStatus,
        paid_amount: Option<Money>,
    ) -> ServiceResult<PaymentOutcome> {
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;
        order.update_payment(requested, paid_amount)?;
        tx.save_order(&order).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            payment_status = %order.payment_status,
            paid = %order.paid_amount,
            "payment updated"
        );
        Ok(PaymentOutcome {
            order_id,
            payment_status: order.payment_status,
            paid_amount: order.paid_amount,
        })
    }

    pub async fn active_services(&self) -> ServiceResult<Vec<Service>> {
        Ok(self.store.active_services().await?)
    }

    pub async fn list_orders(&self, mut query: OrderQuery) -> ServiceResult<Page<OrderView>> {
        query.page = query.page.max(1);
        query.limit = query.limit.clamp(1, self.settings.page_limit_max);
        query.utc_offset = self.settings.utc_offset;
        Ok(self.store.list_orders(&query).await?)
    }

    pub async fn get_order(&self, order_id: OrderId) -> ServiceResult<OrderView> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::not_found(format!("order {order_id} not found"))))
    }

    pub async fn list_bookings(&self, mut query: BookingQuery) -> ServiceResult<Page<BookingView>> {
        query.page = query.page.max(1);
        query.limit = query.limit.clamp(1, self.settings.page_limit_max);
        query.utc_offset = self.settings.utc_offset;
        Ok(self.store.list_bookings(&query).await?)
    }
}
