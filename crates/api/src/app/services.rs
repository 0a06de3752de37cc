use laundry_bookings::NewBooking;
use laundry_catalog::{LineItem, Service};
use laundry_core::{BookingId, Money, OrderId};
use laundry_infra::store::{BookingQuery, BookingView, OrderQuery, OrderView, Page};
use laundry_infra::{
    AppConfig, BookingReceipt, CreatedOrder, EditOutcome, InMemoryStore, LaundryService, PaymentOutcome,
    PostgresStore, ServiceResult, StatusChange, StoreError,
};
use laundry_orders::{OrderStatus, PaymentStatus, WalkInOrder};

/// Workflow service over whichever store the configuration selected.
pub enum AppServices {
    InMemory(LaundryService<InMemoryStore>),
    Persistent(LaundryService<PostgresStore>),
}

macro_rules! with_service {
    ($services:expr, $svc:ident => $call:expr) => {
        match $services {
            AppServices::InMemory($svc) => $call,
            AppServices::Persistent($svc) => $call,
        }
    };
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    match &config.database {
        Some(db) => {
            let store = PostgresStore::connect(db).await?;
            tracing::info!(max_connections = db.max_connections, "using postgres store");
            Ok(AppServices::Persistent(LaundryService::new(store, config.workflow)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Ok(AppServices::InMemory(LaundryService::new(
                InMemoryStore::new(),
                config.workflow,
            )))
        }
    }
}

impl AppServices {
    pub async fn submit_booking(&self, booking: NewBooking) -> ServiceResult<BookingReceipt> {
        with_service!(self, svc => svc.submit_booking(booking).await)
    }

    pub async fn accept_booking(&self, booking_id: BookingId) -> ServiceResult<CreatedOrder> {
        with_service!(self, svc => svc.accept_booking(booking_id).await)
    }

    pub async fn decline_booking(&self, booking_id: BookingId) -> ServiceResult<()> {
        with_service!(self, svc => svc.decline_booking(booking_id).await)
    }

    pub async fn create_walk_in(&self, order: WalkInOrder) -> ServiceResult<CreatedOrder> {
        with_service!(self, svc => svc.create_walk_in(order).await)
    }

    pub async fn update_status(&self, order_id: OrderId, to: OrderStatus) -> ServiceResult<StatusChange> {
        with_service!(self, svc => svc.update_status(order_id, to).await)
    }

    pub async fn edit_order(&self, order_id: OrderId, lines: Vec<LineItem>) -> ServiceResult<EditOutcome> {
        with_service!(self, svc => svc.edit_order(order_id, lines).await)
    }

    pub async fn update_payment(
        &self,
        order_id: OrderId,
        requested: PaymentStatus,
        paid_amount: Option<Money>,
    ) -> ServiceResult<PaymentOutcome> {
        with_service!(self, svc => svc.update_payment(order_id, requested, paid_amount).await)
    }

    pub async fn active_services(&self) -> ServiceResult<Vec<Service>> {
        with_service!(self, svc => svc.active_services().await)
    }

    pub async fn list_orders(&self, query: OrderQuery) -> ServiceResult<Page<OrderView>> {
        with_service!(self, svc => svc.list_orders(query).await)
    }

    pub async fn get_order(&self, order_id: OrderId) -> ServiceResult<OrderView> {
        with_service!(self, svc => svc.get_order(order_id).await)
    }

    pub async fn list_bookings(&self, query: BookingQuery) -> ServiceResult<Page<BookingView>> {
        with_service!(self, svc => svc.list_bookings(query).await)
    }
}
