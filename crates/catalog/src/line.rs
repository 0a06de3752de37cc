//! Line items and the total aggregator.

use serde::{Deserialize, Serialize};

use laundry_core::{DomainError, DomainResult, Money, ServiceId, ValueObject};

/// A (service, quantity, unit price snapshot) row attached to a booking or order.
///
/// `unit_price` is captured when the line is written and never follows later
/// catalog price changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub service_id: ServiceId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl ValueObject for LineItem {}

impl LineItem {
    pub fn new(service_id: ServiceId, quantity: i64, unit_price: Money) -> Self {
        Self {
            service_id,
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    pub fn checked_line_total(&self) -> DomainResult<Money> {
        self.unit_price.checked_times(self.quantity).ok_or_else(|| {
            DomainError::validation(format!(
                "line total for service {} is too large",
                self.service_id
            ))
        })
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity < 0 {
            return Err(DomainError::validation(format!(
                "quantity for service {} cannot be negative",
                self.service_id
            )));
        }
        if self.unit_price.is_negative() {
            return Err(DomainError::validation(format!(
                "unit_price for service {} cannot be negative",
                self.service_id
            )));
        }
        self.checked_line_total().map(|_| ())
    }
}

/// Σ quantity × unit_price, rejecting totals that leave the i64 range.
pub fn lines_total(lines: &[LineItem]) -> DomainResult<Money> {
    lines.iter().try_fold(Money::ZERO, |acc, line| {
        acc.checked_add(line.checked_line_total()?)
            .ok_or_else(|| DomainError::validation("order total is too large"))
    })
}
