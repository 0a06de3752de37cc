use core::str::FromStr;

use serde::{Deserialize, Serialize};

use laundry_core::{DomainError, DomainResult, Money};

/// How much of the order total has been collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Partial => "Partial",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Refunded => "Refunded",
        }
    }

    /// Whether the order still has an outstanding balance.
    pub fn is_outstanding(self) -> bool {
        matches!(self, PaymentStatus::Unpaid | PaymentStatus::Partial)
    }

    /// Status that follows from `paid` against `total`.
    pub fn for_amounts(paid: Money, total: Money) -> PaymentStatus {
        if paid >= total {
            PaymentStatus::Paid
        } else if paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    /// Case-insensitive. "Partially Paid" is accepted for `Partial`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
        match normalized.as_str() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partial" | "partially paid" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(DomainError::validation(
                "Invalid payment_status. Use Paid, Unpaid, or Partial / Partially Paid.",
            )),
        }
    }
}

/// Payment status after the order total changed from `old_total` to `new_total`.
///
/// A fully paid order whose total grows becomes Partial. Otherwise the status
/// follows the paid amount against the new total.
pub fn derive_after_edit(
    current: PaymentStatus,
    old_total: Money,
    new_total: Money,
    paid: Money,
) -> PaymentStatus {
    if current == PaymentStatus::Paid && new_total > old_total && paid.is_positive() && paid < new_total {
        return PaymentStatus::Partial;
    }
    PaymentStatus::for_amounts(paid, new_total)
}

/// Resolve a manual payment update to the `(status, paid)` pair to store.
///
/// `Paid` records the full total, `Unpaid` clears the amount, and `Partial`
/// needs `0 < paid < total`.
pub fn resolve_payment_update(
    requested: PaymentStatus,
    paid_amount: Option<Money>,
    total: Money,
) -> DomainResult<(PaymentStatus, Money)> {
    match requested {
        PaymentStatus::Paid => Ok((PaymentStatus::Paid, total)),
        PaymentStatus::Unpaid => Ok((PaymentStatus::Unpaid, Money::ZERO)),
        PaymentStatus::Partial => {
            let paid = paid_amount.filter(|p| p.is_positive()).ok_or_else(|| {
                DomainError::validation("paid_amount must be greater than 0 for Partial")
            })?;
            if paid >= total {
                return Err(DomainError::validation(
                    "Partial payment must be less than the total amount",
                ));
            }
            Ok((PaymentStatus::Partial, paid))
        }
        PaymentStatus::Refunded => Err(DomainError::validation(
            "Invalid payment_status. Use Paid, Unpaid, or Partial / Partially Paid.",
        )),
    }
}
