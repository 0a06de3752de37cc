//! Walk-in orders created at the counter.

use serde::{Deserialize, Serialize};

use laundry_catalog::ServiceSelection;
use laundry_core::{DomainError, DomainResult, Money};

use crate::code::OrderCode;
use crate::order::{NewOrder, OrderSource};
use crate::payment::PaymentStatus;

/// Payment details captured with a walk-in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkInPayment {
    pub status: PaymentStatus,
    pub paid_amount: Money,
}

impl WalkInPayment {
    /// Check the submitted status and amount before the total is known.
    ///
    /// A missing status means Unpaid.
    pub fn parse(status: Option<&str>, paid_amount: Money) -> DomainResult<Self> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse::<PaymentStatus>()?,
            None => PaymentStatus::Unpaid,
        };
        match status {
            PaymentStatus::Refunded => {
                return Err(DomainError::validation(
                    "a new order cannot start as Refunded",
                ));
            }
            PaymentStatus::Partial if !paid_amount.is_positive() => {
                return Err(DomainError::validation(
                    "paid_amount is required and must be greater than 0 when payment_status is Partial",
                ));
            }
            _ if paid_amount.is_negative() => {
                return Err(DomainError::validation("paid_amount cannot be negative"));
            }
            _ => {}
        }
        Ok(Self { status, paid_amount })
    }

    /// Final `(status, paid)` once the order total is computed.
    pub fn settle(self, total: Money) -> DomainResult<(PaymentStatus, Money)> {
        match self.status {
            PaymentStatus::Partial if self.paid_amount >= total => Err(DomainError::validation(
                "Partial payment must be less than the total amount",
            )),
            PaymentStatus::Paid if self.paid_amount.is_zero() => Ok((PaymentStatus::Paid, total)),
            PaymentStatus::Paid if self.paid_amount < total => Err(DomainError::validation(
                "paid_amount must cover the total amount when payment_status is Paid",
            )),
            PaymentStatus::Unpaid if !self.paid_amount.is_zero() => Err(DomainError::validation(
                "paid_amount must be 0 when payment_status is Unpaid",
            )),
            status => Ok((status, self.paid_amount)),
        }
    }
}

/// Walk-in order as entered on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkInOrder {
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub payment_type: String,
    pub payment: WalkInPayment,
    pub selection: ServiceSelection,
}

impl WalkInOrder {
    pub fn new(
        guest_name: &str,
        guest_phone: Option<&str>,
        payment_type: Option<&str>,
        payment: WalkInPayment,
        selection: ServiceSelection,
    ) -> DomainResult<Self> {
        let guest_name = guest_name.trim();
        if guest_name.is_empty() {
            return Err(DomainError::validation("guest_name is required"));
        }
        selection.validate()?;
        Ok(Self {
            guest_name: guest_name.to_string(),
            guest_phone: guest_phone
                .map(|p| p.split_whitespace().collect::<String>())
                .filter(|p| !p.is_empty()),
            payment_type: payment_type
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Cash")
                .to_string(),
            payment,
            selection,
        })
    }

    pub fn into_new_order(
        self,
        order_code: OrderCode,
        total: Money,
        now: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<NewOrder> {
        let (payment_status, paid_amount) = self.payment.settle(total)?;
        Ok(NewOrder {
            order_code,
            customer_id: None,
            booking_id: None,
            guest_name: Some(self.guest_name),
            guest_phone: self.guest_phone,
            total_amount: total,
            paid_amount,
            payment_type: self.payment_type,
            payment_status,
            source: OrderSource::WalkIn,
            created_at: now,
        })
    }
}
