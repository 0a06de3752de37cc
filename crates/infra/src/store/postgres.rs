//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any other | `Backend` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Backend` |
//!
//! Row decoding failures (unknown status strings, out-of-range numbers)
//! surface as `Corrupt`.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use laundry_bookings::{Booking, BookingStatus, NewBooking};
use laundry_catalog::{LineItem, PackageInclude, Service, ServiceType};
use laundry_core::{BookingId, CustomerId, DomainError, InventoryItemId, Money, OrderId, ServiceId};
use laundry_customers::{Customer, NewCustomer};
use laundry_inventory::{ConsumingLine, StockAdjustment, SupplyLink};
use laundry_orders::{NewOrder, Order, OrderCode};

use super::query::{BookingQuery, BookingView, DetailView, OrderQuery, OrderView, Page};
use super::{LaundryStore, StoreResult, StoreTx};
use crate::config::DatabaseConfig;
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a pool for `config` and apply pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn order_details(&self, order_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<DetailView>>> {
        let rows = sqlx::query(
            r#"
            SELECT od.order_id, od.service_id, od.quantity, od.unit_price, s.service_name, s.service_type
            FROM order_details od
            JOIN services s ON s.service_id = od.service_id
            WHERE od.order_id = ANY($1)
            ORDER BY od.order_detail_id ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_details", e))?;

        group_details(rows, "order_id")
    }

    async fn booking_details(&self, booking_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<DetailView>>> {
        let rows = sqlx::query(
            r#"
            SELECT bd.booking_id, bd.service_id, bd.quantity, bd.unit_price, s.service_name, s.service_type
            FROM booking_details bd
            JOIN services s ON s.service_id = bd.service_id
            WHERE bd.booking_id = ANY($1)
            ORDER BY bd.booking_detail_id ASC
            "#,
        )
        .bind(booking_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("booking_details", e))?;

        group_details(rows, "booking_id")
    }
}

const ORDER_COLUMNS: &str = r#"
    o.order_id, o.order_code, o.customer_id, o.booking_id, o.guest_name, o.guest_phone,
    o.total_amount, o.paid_amount, o.payment_type, o.payment_status, o.status, o.source,
    o.created_at, o.completion_date
"#;

const ORDER_FILTER: &str = r#"
    FROM orders o
    LEFT JOIN customers c ON c.customer_id = o.customer_id
    WHERE (cardinality($1::text[]) = 0 OR o.status = ANY($1))
        AND NOT (o.status = ANY($2::text[]))
        AND ($3::text IS NULL OR o.payment_status = $3)
        AND ($4::text IS NULL OR o.source = $4)
        AND ($5::timestamptz IS NULL OR o.created_at >= $5)
        AND ($6::timestamptz IS NULL OR o.created_at < $6)
        AND ($7::text IS NULL
            OR LOWER(o.order_code) LIKE $7
            OR LOWER(COALESCE(c.name, '')) LIKE $7
            OR LOWER(COALESCE(c.phone_number, '')) LIKE $7
            OR LOWER(COALESCE(o.guest_name, '')) LIKE $7
            OR LOWER(COALESCE(o.guest_phone, '')) LIKE $7)
"#;

const BOOKING_FILTER: &str = r#"
    FROM bookings b
    JOIN customers c ON c.customer_id = b.customer_id
    WHERE (cardinality($1::text[]) = 0 OR b.status = ANY($1))
        AND NOT (b.status = ANY($2::text[]))
        AND ($3::timestamptz IS NULL OR b.created_at >= $3)
        AND ($4::timestamptz IS NULL OR b.created_at < $4)
"#;

#[async_trait]
impl LaundryStore for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> StoreResult<PostgresTx> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresTx { tx })
    }

    #[instrument(skip(self), err)]
    async fn active_services(&self) -> StoreResult<Vec<Service>> {
        let rows = sqlx::query(
            r#"
            SELECT service_id, service_name, price, unit_type, service_type, description, is_active
            FROM services
            WHERE is_active
            ORDER BY service_id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("active_services", e))?;

        rows.iter().map(service_from_row).collect()
    }

    #[instrument(skip(self, query), fields(page = query.page, limit = query.limit), err)]
    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Page<OrderView>> {
        let status: Vec<&str> = query.status.iter().map(|s| s.as_str()).collect();
        let not_status: Vec<&str> = query.not_status.iter().map(|s| s.as_str()).collect();
        let payment_status = query.payment_status.map(|p| p.as_str());
        let source = query.source.map(|s| s.as_str());
        let (start, end) = query.created_range();
        let search = query.search_pattern();

        let count_row = sqlx::query(&format!("SELECT COUNT(*) AS total {ORDER_FILTER}"))
            .bind(&status)
            .bind(&not_status)
            .bind(payment_status)
            .bind(source)
            .bind(start)
            .bind(end)
            .bind(search.as_deref())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))?;
        let total: i64 = count_row.try_get("total").map_err(corrupt)?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS}, c.name AS customer_name, c.phone_number AS customer_phone {ORDER_FILTER} \
             ORDER BY o.created_at {dir}, o.order_id {dir} LIMIT $8 OFFSET $9",
            dir = query.order.as_sql()
        );
        let rows = sqlx::query(&sql)
            .bind(&status)
            .bind(&not_status)
            .bind(payment_status)
            .bind(source)
            .bind(start)
            .bind(end)
            .bind(search.as_deref())
            .bind(i64::from(query.limit))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let ids: Vec<i64> = rows
            .iter()
            .map(|r| r.try_get::<i64, _>("order_id"))
            .collect::<Result<_, _>>()
            .map_err(corrupt)?;
        let mut details = self.order_details(&ids).await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let order = order_from_row(row)?;
            let lines = details.remove(&order.order_id.get()).unwrap_or_default();
            data.push(OrderView::new(
                order,
                row.try_get("customer_name").map_err(corrupt)?,
                row.try_get("customer_phone").map_err(corrupt)?,
                lines,
            ));
        }

        Ok(Page::new(query.page, query.limit, non_negative(total), data))
    }

    #[instrument(skip(self), err)]
    async fn get_order(&self, order_id: OrderId) -> StoreResult<Option<OrderView>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, c.name AS customer_name, c.phone_number AS customer_phone \
             FROM orders o LEFT JOIN customers c ON c.customer_id = o.customer_id \
             WHERE o.order_id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(order_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = order_from_row(&row)?;
        let details = self
            .order_details(&[order_id.get()])
            .await?
            .remove(&order_id.get())
            .unwrap_or_default();
        Ok(Some(OrderView::new(
            order,
            row.try_get("customer_name").map_err(corrupt)?,
            row.try_get("customer_phone").map_err(corrupt)?,
            details,
        )))
    }

    #[instrument(skip(self, query), fields(page = query.page, limit = query.limit), err)]
    async fn list_bookings(&self, query: &BookingQuery) -> StoreResult<Page<BookingView>> {
        let status: Vec<&str> = query.status.iter().map(|s| s.as_str()).collect();
        let not_status: Vec<&str> = query.not_status.iter().map(|s| s.as_str()).collect();
        let (start, end) = query.created_range();

        let count_row = sqlx::query(&format!("SELECT COUNT(*) AS total {BOOKING_FILTER}"))
            .bind(&status)
            .bind(&not_status)
            .bind(start)
            .bind(end)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_bookings", e))?;
        let total: i64 = count_row.try_get("total").map_err(corrupt)?;

        let sql = format!(
            "SELECT b.booking_id, b.customer_id, b.pickup_date, b.payment_type, b.special_instruction, \
                    b.status, b.created_at, c.name, c.phone_number, c.email, c.address \
             {BOOKING_FILTER} \
             ORDER BY b.created_at {dir}, b.booking_id {dir} LIMIT $5 OFFSET $6",
            dir = query.order.as_sql()
        );
        let rows = sqlx::query(&sql)
            .bind(&status)
            .bind(&not_status)
            .bind(start)
            .bind(end)
            .bind(i64::from(query.limit))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_bookings", e))?;

        let ids: Vec<i64> = rows
            .iter()
            .map(|r| r.try_get::<i64, _>("booking_id"))
            .collect::<Result<_, _>>()
            .map_err(corrupt)?;
        let mut details = self.booking_details(&ids).await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let booking = booking_from_row(row)?;
            let lines = details.remove(&booking.booking_id.get()).unwrap_or_default();
            let total_amount = lines.iter().map(|d| d.line_total).sum();
            data.push(BookingView {
                booking,
                name: row.try_get("name").map_err(corrupt)?,
                phone_number: row.try_get("phone_number").map_err(corrupt)?,
                email: row.try_get("email").map_err(corrupt)?,
                address: row.try_get("address").map_err(corrupt)?,
                details: lines,
                total_amount,
            });
        }

        Ok(Page::new(query.page, query.limit, non_negative(total), data))
    }
}

/// Open transaction; rolled back by sqlx when dropped uncommitted.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PostgresTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresTx").finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn find_customer_by_phone(&mut self, phone_number: &str) -> StoreResult<Option<Customer>> {
        let row = sqlx::query(
            "SELECT customer_id, name, phone_number, email, address FROM customers WHERE phone_number = $1",
        )
        .bind(phone_number)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_customer_by_phone", e))?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn insert_customer(&mut self, customer: &NewCustomer) -> StoreResult<Customer> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (name, phone_number, email, address)
            VALUES ($1, $2, $3, $4)
            RETURNING customer_id
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.phone_number)
        .bind(customer.email.as_deref())
        .bind(customer.address.as_deref())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_customer", e))?;

        Ok(Customer {
            customer_id: CustomerId::new(row.try_get("customer_id").map_err(corrupt)?),
            name: customer.name.clone(),
            phone_number: customer.phone_number.clone(),
            email: customer.email.clone(),
            address: customer.address.clone(),
        })
    }

    async fn services_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Service>> {
        let rows = sqlx::query(
            r#"
            SELECT service_id, service_name, price, unit_type, service_type, description, is_active
            FROM services
            WHERE service_name = ANY($1)
            ORDER BY service_id ASC
            "#,
        )
        .bind(names)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("services_by_names", e))?;

        rows.iter().map(service_from_row).collect()
    }

    async fn services_by_ids(&mut self, ids: &[ServiceId]) -> StoreResult<Vec<Service>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT service_id, service_name, price, unit_type, service_type, description, is_active
            FROM services
            WHERE service_id = ANY($1)
            "#,
        )
        .bind(&raw)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("services_by_ids", e))?;

        rows.iter().map(service_from_row).collect()
    }

    async fn insert_booking(
        &mut self,
        customer: &Customer,
        booking: &NewBooking,
        created_at: DateTime<Utc>,
    ) -> StoreResult<BookingId> {
        let row = sqlx::query(
            r#"
            INSERT INTO bookings (customer_id, pickup_date, payment_type, special_instruction, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING booking_id
            "#,
        )
        .bind(customer.customer_id.get())
        .bind(booking.pickup_date)
        .bind(&booking.payment_type)
        .bind(booking.special_instruction.as_deref())
        .bind(BookingStatus::Pending.as_str())
        .bind(created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_booking", e))?;

        Ok(BookingId::new(row.try_get("booking_id").map_err(corrupt)?))
    }

    async fn insert_booking_lines(&mut self, booking_id: BookingId, lines: &[LineItem]) -> StoreResult<()> {
        for line in lines {
            sqlx::query(
                "INSERT INTO booking_details (booking_id, service_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
            )
            .bind(booking_id.get())
            .bind(line.service_id.get())
            .bind(line.quantity)
            .bind(line.unit_price.minor())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_booking_lines", e))?;
        }
        Ok(())
    }

    async fn lock_booking(&mut self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT booking_id, customer_id, pickup_date, payment_type, special_instruction, status, created_at
            FROM bookings
            WHERE booking_id = $1
            FOR UPDATE
            "#,
        )
        .bind(booking_id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_booking", e))?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn booking_lines(&mut self, booking_id: BookingId) -> StoreResult<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT service_id, quantity, unit_price
            FROM booking_details
            WHERE booking_id = $1
            ORDER BY booking_detail_id ASC
            "#,
        )
        .bind(booking_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("booking_lines", e))?;

        rows.iter().map(line_from_row).collect()
    }

    async fn set_booking_status(&mut self, booking_id: BookingId, status: BookingStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE bookings SET status = $2 WHERE booking_id = $1")
            .bind(booking_id.get())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_booking_status", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("booking {booking_id}")));
        }
        Ok(())
    }

    async fn next_order_sequence(&mut self, day: NaiveDate) -> StoreResult<u32> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_code_counters (day, last_seq)
            VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET last_seq = order_code_counters.last_seq + 1
            RETURNING last_seq
            "#,
        )
        .bind(day)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("next_order_sequence", e))?;

        let seq: i32 = row.try_get("last_seq").map_err(corrupt)?;
        u32::try_from(seq).map_err(|_| StoreError::Corrupt(format!("negative order sequence {seq}")))
    }

    async fn order_for_booking(&mut self, booking_id: BookingId) -> StoreResult<Option<OrderId>> {
        let row = sqlx::query("SELECT order_id FROM orders WHERE booking_id = $1")
            .bind(booking_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("order_for_booking", e))?;

        row.map(|r| r.try_get::<i64, _>("order_id").map(OrderId::new))
            .transpose()
            .map_err(corrupt)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> StoreResult<OrderId> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (
                order_code, customer_id, booking_id, guest_name, guest_phone,
                total_amount, paid_amount, payment_type, payment_status, status, source, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'Stand By', $10, $11)
            RETURNING order_id
            "#,
        )
        .bind(order.order_code.as_str())
        .bind(order.customer_id.map(|id| id.get()))
        .bind(order.booking_id.map(|id| id.get()))
        .bind(order.guest_name.as_deref())
        .bind(order.guest_phone.as_deref())
        .bind(order.total_amount.minor())
        .bind(order.paid_amount.minor())
        .bind(&order.payment_type)
        .bind(order.payment_status.as_str())
        .bind(order.source.as_str())
        .bind(order.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        Ok(OrderId::new(row.try_get("order_id").map_err(corrupt)?))
    }

    async fn insert_order_lines(&mut self, order_id: OrderId, lines: &[LineItem]) -> StoreResult<()> {
        for line in lines {
            sqlx::query(
                "INSERT INTO order_details (order_id, service_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id.get())
            .bind(line.service_id.get())
            .bind(line.quantity)
            .bind(line.unit_price.minor())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_lines", e))?;
        }
        Ok(())
    }

    async fn delete_order_lines(&mut self, order_id: OrderId, service_ids: &[ServiceId]) -> StoreResult<()> {
        let raw: Vec<i64> = service_ids.iter().map(|id| id.get()).collect();
        sqlx::query("DELETE FROM order_details WHERE order_id = $1 AND service_id = ANY($2)")
            .bind(order_id.get())
            .bind(&raw)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order_lines", e))?;
        Ok(())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.order_id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(order_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_order", e))?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn order_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT service_id, quantity, unit_price
            FROM order_details
            WHERE order_id = $1
            ORDER BY order_detail_id ASC
            "#,
        )
        .bind(order_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order_lines", e))?;

        rows.iter().map(line_from_row).collect()
    }

    async fn save_order(&mut self, order: &Order) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, payment_status = $3, paid_amount = $4, total_amount = $5, completion_date = $6
            WHERE order_id = $1
            "#,
        )
        .bind(order.order_id.get())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.paid_amount.minor())
        .bind(order.total_amount.minor())
        .bind(order.completion_date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {}", order.order_id)));
        }
        Ok(())
    }

    async fn consuming_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<ConsumingLine>> {
        let rows = sqlx::query(
            r#"
            SELECT od.service_id, s.service_type, od.quantity
            FROM order_details od
            JOIN services s ON s.service_id = od.service_id
            WHERE od.order_id = $1
            "#,
        )
        .bind(order_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("consuming_lines", e))?;

        rows.iter()
            .map(|row| {
                Ok(ConsumingLine {
                    service_id: ServiceId::new(row.try_get("service_id").map_err(corrupt)?),
                    service_type: parse_column(row, "service_type")?,
                    quantity: row.try_get("quantity").map_err(corrupt)?,
                })
            })
            .collect()
    }

    async fn supply_links(&mut self, service_ids: &[ServiceId]) -> StoreResult<Vec<SupplyLink>> {
        let raw: Vec<i64> = service_ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query("SELECT item_id, service_id FROM inventory WHERE service_id = ANY($1)")
            .bind(&raw)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("supply_links", e))?;

        rows.iter()
            .map(|row| {
                Ok(SupplyLink {
                    service_id: ServiceId::new(row.try_get("service_id").map_err(corrupt)?),
                    inventory_item_id: InventoryItemId::new(row.try_get("item_id").map_err(corrupt)?),
                })
            })
            .collect()
    }

    async fn package_includes(&mut self, bundle_ids: &[ServiceId]) -> StoreResult<Vec<PackageInclude>> {
        let raw: Vec<i64> = bundle_ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT bundle_service_id, inventory_item_id, quantity_used
            FROM package_includes
            WHERE bundle_service_id = ANY($1)
            "#,
        )
        .bind(&raw)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("package_includes", e))?;

        rows.iter()
            .map(|row| {
                Ok(PackageInclude {
                    bundle_service_id: ServiceId::new(row.try_get("bundle_service_id").map_err(corrupt)?),
                    inventory_item_id: InventoryItemId::new(row.try_get("inventory_item_id").map_err(corrupt)?),
                    quantity_used: row.try_get("quantity_used").map_err(corrupt)?,
                })
            })
            .collect()
    }

    async fn lock_inventory(
        &mut self,
        items: &[InventoryItemId],
    ) -> StoreResult<BTreeMap<InventoryItemId, i64>> {
        let raw: Vec<i64> = items.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            "SELECT item_id, quantity FROM inventory WHERE item_id = ANY($1) ORDER BY item_id ASC FOR UPDATE",
        )
        .bind(&raw)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_inventory", e))?;

        rows.iter()
            .map(|row| {
                Ok((
                    InventoryItemId::new(row.try_get("item_id").map_err(corrupt)?),
                    row.try_get::<i64, _>("quantity").map_err(corrupt)?,
                ))
            })
            .collect()
    }

    async fn apply_stock_adjustment(&mut self, adjustment: &StockAdjustment) -> StoreResult<()> {
        sqlx::query("UPDATE inventory SET quantity = quantity - $2 WHERE item_id = $1")
            .bind(adjustment.item_id.get())
            .bind(adjustment.deducted)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("apply_stock_adjustment", e))?;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn non_negative(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn parse_column<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: FromStr<Err = DomainError>,
{
    let raw: String = row.try_get(column).map_err(corrupt)?;
    raw.parse::<T>()
        .map_err(|e| StoreError::Corrupt(format!("{column}: {}", e.message())))
}

fn customer_from_row(row: &PgRow) -> StoreResult<Customer> {
    Ok(Customer {
        customer_id: CustomerId::new(row.try_get("customer_id").map_err(corrupt)?),
        name: row.try_get("name").map_err(corrupt)?,
        phone_number: row.try_get("phone_number").map_err(corrupt)?,
        email: row.try_get("email").map_err(corrupt)?,
        address: row.try_get("address").map_err(corrupt)?,
    })
}

fn service_from_row(row: &PgRow) -> StoreResult<Service> {
    Ok(Service {
        service_id: ServiceId::new(row.try_get("service_id").map_err(corrupt)?),
        service_name: row.try_get("service_name").map_err(corrupt)?,
        price: Money::from_minor(row.try_get("price").map_err(corrupt)?),
        unit_type: row.try_get("unit_type").map_err(corrupt)?,
        service_type: parse_column::<ServiceType>(row, "service_type")?,
        description: row.try_get("description").map_err(corrupt)?,
        is_active: row.try_get("is_active").map_err(corrupt)?,
    })
}

fn line_from_row(row: &PgRow) -> StoreResult<LineItem> {
    Ok(LineItem::new(
        ServiceId::new(row.try_get("service_id").map_err(corrupt)?),
        row.try_get("quantity").map_err(corrupt)?,
        Money::from_minor(row.try_get("unit_price").map_err(corrupt)?),
    ))
}

fn booking_from_row(row: &PgRow) -> StoreResult<Booking> {
    Ok(Booking {
        booking_id: BookingId::new(row.try_get("booking_id").map_err(corrupt)?),
        customer_id: CustomerId::new(row.try_get("customer_id").map_err(corrupt)?),
        pickup_date: row.try_get("pickup_date").map_err(corrupt)?,
        payment_type: row.try_get("payment_type").map_err(corrupt)?,
        special_instruction: row.try_get("special_instruction").map_err(corrupt)?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let customer_id: Option<i64> = row.try_get("customer_id").map_err(corrupt)?;
    let booking_id: Option<i64> = row.try_get("booking_id").map_err(corrupt)?;
    let order_code: String = row.try_get("order_code").map_err(corrupt)?;
    Ok(Order {
        order_id: OrderId::new(row.try_get("order_id").map_err(corrupt)?),
        order_code: OrderCode::from_stored(order_code),
        customer_id: customer_id.map(CustomerId::new),
        booking_id: booking_id.map(BookingId::new),
        guest_name: row.try_get("guest_name").map_err(corrupt)?,
        guest_phone: row.try_get("guest_phone").map_err(corrupt)?,
        total_amount: Money::from_minor(row.try_get("total_amount").map_err(corrupt)?),
        paid_amount: Money::from_minor(row.try_get("paid_amount").map_err(corrupt)?),
        payment_type: row.try_get("payment_type").map_err(corrupt)?,
        payment_status: parse_column(row, "payment_status")?,
        status: parse_column(row, "status")?,
        source: parse_column(row, "source")?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        completion_date: row.try_get("completion_date").map_err(corrupt)?,
    })
}

fn group_details(rows: Vec<PgRow>, parent_column: &str) -> StoreResult<HashMap<i64, Vec<DetailView>>> {
    let mut grouped: HashMap<i64, Vec<DetailView>> = HashMap::new();
    for row in &rows {
        let parent: i64 = row.try_get(parent_column).map_err(corrupt)?;
        let line = line_from_row(row)?;
        let name: String = row.try_get("service_name").map_err(corrupt)?;
        let service_type = parse_column::<ServiceType>(row, "service_type")?;
        grouped
            .entry(parent)
            .or_default()
            .push(DetailView::new(&line, name, service_type));
    }
    Ok(grouped)
}

/// Map sqlx errors to [`StoreError`], keeping the failing operation in the message.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("unexpected row not found in {operation}")),
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
