use chrono::NaiveDate;
use serde::Deserialize;

use laundry_bookings::{BookingStatus, NewBooking};
use laundry_catalog::{LineItem, ServiceSelection, SupplyRequest};
use laundry_core::{DomainError, DomainResult, Money, ServiceId};
use laundry_customers::NewCustomer;
use laundry_infra::store::{BookingQuery, OrderQuery, SortOrder};
use laundry_orders::{OrderSource, OrderStatus, PaymentStatus, WalkInOrder, WalkInPayment};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AddBookingRequest {
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub pickup_date: NaiveDate,
    pub payment_type: Option<String>,
    pub special_instruction: Option<String>,
    pub load: Option<i64>,
    pub promo: Option<String>,
    #[serde(default)]
    pub main_services: Vec<String>,
    #[serde(default)]
    pub supplies: Vec<SupplyRequest>,
}

impl AddBookingRequest {
    pub fn into_new_booking(self) -> NewBooking {
        NewBooking {
            customer: NewCustomer {
                name: self.name,
                phone_number: self.phone_number,
                email: self.email,
                address: self.address,
            },
            pickup_date: self.pickup_date,
            payment_type: self.payment_type.unwrap_or_default(),
            special_instruction: self.special_instruction,
            selection: selection(self.load, self.promo, self.main_services, self.supplies),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateWalkInRequest {
    pub guest_name: Option<String>,
    pub guest_phone_number: Option<String>,
    pub load: Option<i64>,
    pub promo: Option<String>,
    #[serde(default)]
    pub main_services: Vec<String>,
    #[serde(default)]
    pub supplies: Vec<SupplyRequest>,
    pub payment_type: Option<String>,
    pub payment_status: Option<String>,
    pub paid_amount: Option<Money>,
}

impl CreateWalkInRequest {
    pub fn into_walk_in(self) -> DomainResult<WalkInOrder> {
        let payment = WalkInPayment::parse(
            self.payment_status.as_deref(),
            self.paid_amount.unwrap_or(Money::ZERO),
        )?;
        WalkInOrder::new(
            self.guest_name.as_deref().unwrap_or_default(),
            self.guest_phone_number.as_deref(),
            self.payment_type.as_deref(),
            payment,
            selection(self.load, self.promo, self.main_services, self.supplies),
        )
    }
}

/// A missing or zero load counts as one load.
fn selection(
    load: Option<i64>,
    promo: Option<String>,
    main_services: Vec<String>,
    supplies: Vec<SupplyRequest>,
) -> ServiceSelection {
    ServiceSelection {
        load: load.filter(|l| *l != 0).unwrap_or(1),
        promo,
        main_services,
        supplies,
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

impl UpdateStatusRequest {
    pub fn status(&self) -> DomainResult<OrderStatus> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse(),
            None => Err(DomainError::validation("status is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub payment_status: Option<String>,
    pub paid_amount: Option<Money>,
}

impl UpdatePaymentRequest {
    pub fn payment_status(&self) -> DomainResult<PaymentStatus> {
        match self.payment_status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse(),
            None => Err(DomainError::validation("payment_status is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditLineRequest {
    pub service_id: ServiceId,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Deserialize)]
pub struct EditOrderRequest {
    #[serde(rename = "updatedDetails", default)]
    pub updated_details: Vec<EditLineRequest>,
}

impl EditOrderRequest {
    pub fn into_lines(self) -> DomainResult<Vec<LineItem>> {
        if self.updated_details.is_empty() {
            return Err(DomainError::validation("updatedDetails must contain at least one line"));
        }
        Ok(self
            .updated_details
            .into_iter()
            .map(|d| LineItem::new(d.service_id, d.quantity, d.unit_price))
            .collect())
    }
}

// -------------------------
// Query-string DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    #[serde(rename = "notStatus")]
    pub not_status: Option<String>,
    pub payment_status: Option<String>,
    pub source: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub order: Option<String>,
}

impl OrderListParams {
    pub fn into_query(self) -> DomainResult<OrderQuery> {
        let defaults = OrderQuery::default();
        Ok(OrderQuery {
            status: status_list(self.status.as_deref())?,
            not_status: status_list(self.not_status.as_deref())?,
            payment_status: optional(self.payment_status.as_deref())?,
            source: optional::<OrderSource>(self.source.as_deref())?,
            from: date(self.from.as_deref(), "from")?,
            to: date(self.to.as_deref(), "to")?,
            search: clean(self.search.as_deref()).map(str::to_string),
            utc_offset: defaults.utc_offset,
            page: number(self.page.as_deref(), "page")?.unwrap_or(defaults.page),
            limit: number(self.limit.as_deref(), "limit")?.unwrap_or(defaults.limit),
            order: sort_order(self.order.as_deref()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListParams {
    pub status: Option<String>,
    #[serde(rename = "notStatus")]
    pub not_status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub order: Option<String>,
}

impl BookingListParams {
    pub fn into_query(self) -> DomainResult<BookingQuery> {
        let defaults = BookingQuery::default();
        Ok(BookingQuery {
            status: status_list::<BookingStatus>(self.status.as_deref())?,
            not_status: status_list::<BookingStatus>(self.not_status.as_deref())?,
            from: date(self.from.as_deref(), "from")?,
            to: date(self.to.as_deref(), "to")?,
            utc_offset: defaults.utc_offset,
            page: number(self.page.as_deref(), "page")?.unwrap_or(defaults.page),
            limit: number(self.limit.as_deref(), "limit")?.unwrap_or(defaults.limit),
            order: sort_order(self.order.as_deref()),
        })
    }
}

/// Strip surrounding quotes and whitespace; blank means absent.
fn clean(raw: Option<&str>) -> Option<&str> {
    raw.map(|v| v.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|v| !v.is_empty())
}

/// Comma-separated statuses. `all` disables the filter.
fn status_list<T>(raw: Option<&str>) -> DomainResult<Vec<T>>
where
    T: std::str::FromStr<Err = DomainError> + PartialEq,
{
    let Some(raw) = clean(raw) else {
        return Ok(Vec::new());
    };
    if raw.eq_ignore_ascii_case("all") {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let status = part.parse::<T>()?;
        if !out.contains(&status) {
            out.push(status);
        }
    }
    Ok(out)
}

fn optional<T>(raw: Option<&str>) -> DomainResult<Option<T>>
where
    T: std::str::FromStr<Err = DomainError>,
{
    match clean(raw) {
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => v.parse().map(Some),
        None => Ok(None),
    }
}

fn date(raw: Option<&str>, field: &str) -> DomainResult<Option<NaiveDate>> {
    clean(raw)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map_err(|_| DomainError::validation(format!("{field} must be a YYYY-MM-DD date")))
        })
        .transpose()
}

fn number(raw: Option<&str>, field: &str) -> DomainResult<Option<u32>> {
    clean(raw)
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| DomainError::validation(format!("{field} must be a non-negative integer")))
        })
        .transpose()
}

/// Anything other than `asc` sorts newest first.
fn sort_order(raw: Option<&str>) -> SortOrder {
    clean(raw).and_then(SortOrder::parse).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_params_parse_comma_lists_and_all() {
        let params = OrderListParams {
            status: Some("Stand By, Processing".into()),
            not_status: Some("all".into()),
            source: Some("'walk-in'".into()),
            page: Some("2".into()),
            order: Some("asc".into()),
            ..Default::default()
        };
        let q = params.into_query().unwrap();
        assert_eq!(q.status, vec![OrderStatus::StandBy, OrderStatus::Processing]);
        assert!(q.not_status.is_empty());
        assert_eq!(q.source, Some(OrderSource::WalkIn));
        assert_eq!(q.page, 2);
        assert_eq!(q.limit, OrderQuery::default().limit);
        assert_eq!(q.order, SortOrder::Asc);
    }

    #[test]
    fn unknown_status_in_filter_is_rejected() {
        let params = OrderListParams {
            status: Some("Lost".into()),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn bad_dates_are_rejected() {
        let params = BookingListParams {
            from: Some("03/05/2024".into()),
            ..Default::default()
        };
        assert!(params.into_query().is_err());
    }

    #[test]
    fn walk_in_defaults_load_to_one() {
        let req: CreateWalkInRequest = serde_json::from_value(serde_json::json!({
            "guest_name": "Ana",
            "main_services": ["Wash"],
            "load": 0
        }))
        .unwrap();
        let order = req.into_walk_in().unwrap();
        assert_eq!(order.selection.load, 1);
        assert_eq!(order.payment.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn walk_in_requires_guest_name() {
        let req: CreateWalkInRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(
            req.into_walk_in().unwrap_err(),
            DomainError::validation("guest_name is required")
        );
    }

    #[test]
    fn edit_request_reads_updated_details() {
        let req: EditOrderRequest = serde_json::from_value(serde_json::json!({
            "updatedDetails": [{"service_id": 3, "quantity": 2, "unit_price": 5000}]
        }))
        .unwrap();
        let lines = req.into_lines().unwrap();
        assert_eq!(lines, vec![LineItem::new(ServiceId::new(3), 2, Money::from_minor(5000))]);
    }
}
