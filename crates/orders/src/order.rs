use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use laundry_bookings::Booking;
use laundry_core::{BookingId, CustomerId, DomainError, DomainResult, Entity, Money, OrderId};

use crate::code::OrderCode;
use crate::payment::{PaymentStatus, resolve_payment_update};
use crate::status::{OrderStatus, TransitionEffect};

/// Where an order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSource {
    #[serde(rename = "Walk-in")]
    WalkIn,
    Booking,
}

impl OrderSource {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSource::WalkIn => "Walk-in",
            OrderSource::Booking => "Booking",
        }
    }
}

impl core::fmt::Display for OrderSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walk-in" | "walkin" | "walk_in" => Ok(OrderSource::WalkIn),
            "booking" => Ok(OrderSource::Booking),
            other => Err(DomainError::validation(format!("unknown order source '{other}'"))),
        }
    }
}

/// Order row.
///
/// Booking orders carry `customer_id` and `booking_id`; walk-in orders carry
/// the guest fields instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub order_code: OrderCode,
    pub customer_id: Option<CustomerId>,
    pub booking_id: Option<BookingId>,
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub payment_type: String,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub source: OrderSource,
    pub created_at: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.order_id
    }
}

impl Order {
    /// Move the order to `to`, updating the fields the transition implies.
    ///
    /// On error the order is left untouched.
    pub fn transition(&mut self, to: OrderStatus, now: DateTime<Utc>) -> DomainResult<TransitionEffect> {
        self.status.check_move(to)?;
        if to == OrderStatus::Completed && self.payment_status.is_outstanding() {
            return Err(DomainError::validation(
                "payment must be fully paid before the order can be completed",
            ));
        }

        self.status = to;
        let effect = match to {
            OrderStatus::Processing => TransitionEffect::DrawInventory,
            OrderStatus::Completed => {
                self.completion_date = Some(now);
                TransitionEffect::Completed
            }
            OrderStatus::Cancelled if !self.paid_amount.is_zero() => {
                self.payment_status = PaymentStatus::Refunded;
                TransitionEffect::Refunded
            }
            _ => TransitionEffect::None,
        };
        Ok(effect)
    }

    /// Apply a manual payment update.
    pub fn update_payment(&mut self, requested: PaymentStatus, paid_amount: Option<Money>) -> DomainResult<()> {
        if self.status == OrderStatus::Cancelled || self.payment_status == PaymentStatus::Refunded {
            return Err(DomainError::validation(
                "payment cannot change on a cancelled or refunded order",
            ));
        }
        let (status, paid) = resolve_payment_update(requested, paid_amount, self.total_amount)?;
        self.payment_status = status;
        self.paid_amount = paid;
        Ok(())
    }

    pub fn balance(&self) -> Money {
        self.total_amount - self.paid_amount
    }
}

/// Order about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_code: OrderCode,
    pub customer_id: Option<CustomerId>,
    pub booking_id: Option<BookingId>,
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub payment_type: String,
    pub payment_status: PaymentStatus,
    pub source: OrderSource,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Order created by accepting `booking`. Starts Stand By and Unpaid.
    pub fn from_booking(booking: &Booking, order_code: OrderCode, total: Money, now: DateTime<Utc>) -> Self {
        Self {
            order_code,
            customer_id: Some(booking.customer_id),
            booking_id: Some(booking.booking_id),
            guest_name: None,
            guest_phone: None,
            total_amount: total,
            paid_amount: Money::ZERO,
            payment_type: booking.payment_type.clone(),
            payment_status: PaymentStatus::Unpaid,
            source: OrderSource::Booking,
            created_at: now,
        }
    }

    pub fn into_order(self, order_id: OrderId) -> Order {
        Order {
            order_id,
            order_code: self.order_code,
            customer_id: self.customer_id,
            booking_id: self.booking_id,
            guest_name: self.guest_name,
            guest_phone: self.guest_phone,
            total_amount: self.total_amount,
            paid_amount: self.paid_amount,
            payment_type: self.payment_type,
            payment_status: self.payment_status,
            status: OrderStatus::StandBy,
            source: self.source,
            created_at: self.created_at,
            completion_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use laundry_bookings::BookingStatus;
    use proptest::prelude::*;

    fn order(status: OrderStatus, payment_status: PaymentStatus, paid: i64) -> Order {
        Order {
            order_id: OrderId::new(1),
            order_code: OrderCode::from_stored("ORD030524001"),
            customer_id: None,
            booking_id: None,
            guest_name: Some("Walk-in Guest".into()),
            guest_phone: None,
            total_amount: Money::from_minor(50000),
            paid_amount: Money::from_minor(paid),
            payment_type: "Cash".into(),
            payment_status,
            status,
            source: OrderSource::WalkIn,
            created_at: Utc::now(),
            completion_date: None,
        }
    }

    #[test]
    fn entering_processing_draws_inventory() {
        let mut o = order(OrderStatus::StandBy, PaymentStatus::Unpaid, 0);
        assert_eq!(o.transition(OrderStatus::Processing, Utc::now()).unwrap(), TransitionEffect::DrawInventory);
        assert_eq!(o.status, OrderStatus::Processing);
    }

    #[test]
    fn unpaid_order_cannot_complete() {
        let mut o = order(OrderStatus::StandBy, PaymentStatus::Unpaid, 0);
        assert!(o.transition(OrderStatus::Completed, Utc::now()).is_err());
        assert_eq!(o.status, OrderStatus::StandBy);

        let mut o = order(OrderStatus::Ready, PaymentStatus::Partial, 100);
        assert!(o.transition(OrderStatus::Completed, Utc::now()).is_err());
    }

    #[test]
    fn completing_paid_order_stamps_completion_date() {
        let now = Utc::now();
        let mut o = order(OrderStatus::Ready, PaymentStatus::Paid, 50000);
        assert_eq!(o.transition(OrderStatus::Completed, now).unwrap(), TransitionEffect::Completed);
        assert_eq!(o.completion_date, Some(now));
    }

    #[test]
    fn cancelling_with_money_on_file_refunds() {
        let mut o = order(OrderStatus::StandBy, PaymentStatus::Partial, 20000);
        assert_eq!(o.transition(OrderStatus::Cancelled, Utc::now()).unwrap(), TransitionEffect::Refunded);
        assert_eq!(o.payment_status, PaymentStatus::Refunded);
        assert_eq!(o.paid_amount, Money::from_minor(20000));

        let mut o = order(OrderStatus::StandBy, PaymentStatus::Unpaid, 0);
        assert_eq!(o.transition(OrderStatus::Cancelled, Utc::now()).unwrap(), TransitionEffect::None);
        assert_eq!(o.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn payment_update_refused_after_cancel() {
        let mut o = order(OrderStatus::Cancelled, PaymentStatus::Unpaid, 0);
        assert!(o.update_payment(PaymentStatus::Paid, None).is_err());
    }

    #[test]
    fn payment_update_paid_records_total() {
        let mut o = order(OrderStatus::Processing, PaymentStatus::Unpaid, 0);
        o.update_payment(PaymentStatus::Paid, None).unwrap();
        assert_eq!(o.paid_amount, o.total_amount);
        assert_eq!(o.balance(), Money::ZERO);
    }

    #[test]
    fn booking_conversion_starts_stand_by_unpaid() {
        let booking = Booking {
            booking_id: BookingId::new(7),
            customer_id: CustomerId::new(3),
            pickup_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            payment_type: "GCash".into(),
            special_instruction: None,
            status: BookingStatus::Accepted,
            created_at: Utc::now(),
        };
        let new = NewOrder::from_booking(&booking, OrderCode::from_stored("ORD030524001"), Money::from_minor(500), Utc::now());
        let o = new.into_order(OrderId::new(9));
        assert_eq!(o.status, OrderStatus::StandBy);
        assert_eq!(o.payment_status, PaymentStatus::Unpaid);
        assert_eq!(o.paid_amount, Money::ZERO);
        assert_eq!(o.payment_type, "GCash");
        assert_eq!(o.booking_id, Some(BookingId::new(7)));
        assert_eq!(o.source, OrderSource::Booking);
    }

    fn any_status() -> impl Strategy<Value = OrderStatus> {
        prop::sample::select(OrderStatus::ALL.to_vec())
    }

    fn any_payment() -> impl Strategy<Value = PaymentStatus> {
        prop::sample::select(vec![PaymentStatus::Unpaid, PaymentStatus::Partial, PaymentStatus::Paid])
    }

    proptest! {
        #[test]
        fn transitions_never_leave_terminal_states_or_complete_unpaid(
            path in prop::collection::vec(any_status(), 0..8),
            payment in any_payment(),
        ) {
            let paid = match payment {
                PaymentStatus::Paid => 50000,
                PaymentStatus::Partial => 100,
                _ => 0,
            };
            let mut o = order(OrderStatus::StandBy, payment, paid);
            for to in path {
                let before = o.status;
                match o.transition(to, Utc::now()) {
                    Ok(_) => {
                        prop_assert!(!before.is_terminal());
                        if to == OrderStatus::Completed {
                            prop_assert_eq!(payment, PaymentStatus::Paid);
                            prop_assert!(o.completion_date.is_some());
                        }
                        if to == OrderStatus::Cancelled {
                            prop_assert_eq!(before, OrderStatus::StandBy);
                        }
                    }
                    Err(_) => prop_assert_eq!(o.status, before),
                }
            }
        }
    }
}
