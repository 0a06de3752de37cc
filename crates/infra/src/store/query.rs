//! Listing filters and the read models they return.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::Serialize;

use laundry_bookings::{Booking, BookingStatus};
use laundry_catalog::{LineItem, ServiceType};
use laundry_core::{Money, ServiceId};
use laundry_orders::{Order, OrderSource, OrderStatus, PaymentStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// `from`/`to` are inclusive calendar days in the shop's local time.
fn created_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    utc_offset: FixedOffset,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let local_midnight = |day: NaiveDate| {
        day.and_hms_opt(0, 0, 0)
            .and_then(|dt| utc_offset.from_local_datetime(&dt).single())
            .map(|dt| dt.with_timezone(&Utc))
    };
    let start = from.and_then(local_midnight);
    let end = to.and_then(|d| d.checked_add_days(Days::new(1))).and_then(local_midnight);
    (start, end)
}

fn offset(page: u32, limit: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(limit)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: Vec<OrderStatus>,
    pub not_status: Vec<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub source: Option<OrderSource>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Case-insensitive match on order code, customer or guest name and phone.
    pub search: Option<String>,
    /// Offset of the shop day `from`/`to` refer to. The service fills it from settings.
    pub utc_offset: FixedOffset,
    pub page: u32,
    pub limit: u32,
    pub order: SortOrder,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            status: Vec::new(),
            not_status: Vec::new(),
            payment_status: None,
            source: None,
            from: None,
            to: None,
            search: None,
            utc_offset: Utc.fix(),
            page: 1,
            limit: 10,
            order: SortOrder::Desc,
        }
    }
}

impl OrderQuery {
    pub fn created_range(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        created_range(self.from, self.to, self.utc_offset)
    }

    pub fn offset(&self) -> u64 {
        offset(self.page, self.limit)
    }

    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()))
    }

    /// Row-level filter used by the in-memory store.
    pub(crate) fn matches(&self, order: &Order, customer_name: Option<&str>, customer_phone: Option<&str>) -> bool {
        if !self.status.is_empty() && !self.status.contains(&order.status) {
            return false;
        }
        if self.not_status.contains(&order.status) {
            return false;
        }
        if self.payment_status.is_some_and(|p| p != order.payment_status) {
            return false;
        }
        if self.source.is_some_and(|s| s != order.source) {
            return false;
        }
        let (start, end) = self.created_range();
        if start.is_some_and(|s| order.created_at < s) || end.is_some_and(|e| order.created_at >= e) {
            return false;
        }
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = [
                Some(order.order_code.as_str()),
                customer_name,
                customer_phone,
                order.guest_name.as_deref(),
                order.guest_phone.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingQuery {
    pub status: Vec<BookingStatus>,
    pub not_status: Vec<BookingStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub utc_offset: FixedOffset,
    pub page: u32,
    pub limit: u32,
    pub order: SortOrder,
}

impl Default for BookingQuery {
    fn default() -> Self {
        Self {
            status: Vec::new(),
            not_status: Vec::new(),
            from: None,
            to: None,
            utc_offset: Utc.fix(),
            page: 1,
            limit: 10,
            order: SortOrder::Desc,
        }
    }
}

impl BookingQuery {
    pub fn created_range(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        created_range(self.from, self.to, self.utc_offset)
    }

    pub fn offset(&self) -> u64 {
        offset(self.page, self.limit)
    }

    pub(crate) fn matches(&self, booking: &Booking) -> bool {
        if !self.status.is_empty() && !self.status.contains(&booking.status) {
            return false;
        }
        if self.not_status.contains(&booking.status) {
            return false;
        }
        let (start, end) = self.created_range();
        !(start.is_some_and(|s| booking.created_at < s) || end.is_some_and(|e| booking.created_at >= e))
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(page: u32, limit: u32, total: u64, data: Vec<T>) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(u64::from(limit)) };
        Self {
            page,
            limit,
            total,
            total_pages,
            data,
        }
    }
}

/// Line item with catalog fields for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub service_id: ServiceId,
    pub service_name: String,
    pub service_type: ServiceType,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl DetailView {
    pub fn new(line: &LineItem, service_name: String, service_type: ServiceType) -> Self {
        Self {
            service_id: line.service_id,
            service_name,
            service_type,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub details: Vec<DetailView>,
    /// Σ line_total over `details`.
    pub calculated_total: Money,
}

impl OrderView {
    pub fn new(order: Order, customer_name: Option<String>, customer_phone: Option<String>, details: Vec<DetailView>) -> Self {
        let calculated_total = details.iter().map(|d| d.line_total).sum();
        Self {
            order,
            customer_name,
            customer_phone,
            details,
            calculated_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub details: Vec<DetailView>,
    pub total_amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<()> = Page::new(1, 10, 21, vec![]);
        assert_eq!(page.total_pages, 3);
        let empty: Page<()> = Page::new(1, 10, 0, vec![]);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn date_range_is_inclusive_of_the_last_day() {
        let q = OrderQuery {
            from: NaiveDate::from_ymd_opt(2024, 3, 1),
            to: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..Default::default()
        };
        let (start, end) = q.created_range();
        assert_eq!(start.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end.unwrap().to_rfc3339(), "2024-03-06T00:00:00+00:00");
    }

    #[test]
    fn date_range_starts_at_local_midnight() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5);
        let q = BookingQuery {
            from: day,
            to: day,
            utc_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
            ..Default::default()
        };
        let (start, end) = q.created_range();
        assert_eq!(start.unwrap().to_rfc3339(), "2024-03-04T16:00:00+00:00");
        assert_eq!(end.unwrap().to_rfc3339(), "2024-03-05T16:00:00+00:00");
    }

    #[test]
    fn offset_starts_at_page_one() {
        let q = BookingQuery { page: 3, limit: 20, ..Default::default() };
        assert_eq!(q.offset(), 40);
        let first = BookingQuery { page: 0, ..Default::default() };
        assert_eq!(first.offset(), 0);
    }
}
