use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use laundry_catalog::ServiceSelection;
use laundry_core::{BookingId, CustomerId, DomainError, DomainResult, Entity};
use laundry_customers::NewCustomer;

/// Booking status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Accepted,
    Declined,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Accepted => "Accepted",
            BookingStatus::Declined => "Declined",
        }
    }
}

impl core::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "accepted" => Ok(BookingStatus::Accepted),
            "declined" => Ok(BookingStatus::Declined),
            other => Err(DomainError::validation(format!("unknown booking status '{other}'"))),
        }
    }
}

/// Persisted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: BookingId,
    pub customer_id: CustomerId,
    pub pickup_date: NaiveDate,
    pub payment_type: String,
    pub special_instruction: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Booking {
    type Id = BookingId;

    fn id(&self) -> BookingId {
        self.booking_id
    }
}

impl Booking {
    /// Mark the booking accepted.
    ///
    /// Re-accepting an accepted booking is allowed here; the caller's
    /// one-order-per-booking guard is what reports the duplicate.
    pub fn accept(&mut self) -> DomainResult<()> {
        match self.status {
            BookingStatus::Pending | BookingStatus::Accepted => {
                self.status = BookingStatus::Accepted;
                Ok(())
            }
            BookingStatus::Declined => Err(DomainError::conflict(
                "declined bookings cannot be accepted",
            )),
        }
    }

    pub fn decline(&mut self) -> DomainResult<()> {
        match self.status {
            BookingStatus::Pending => {
                self.status = BookingStatus::Declined;
                Ok(())
            }
            BookingStatus::Declined => Err(DomainError::conflict("booking is already declined")),
            BookingStatus::Accepted => Err(DomainError::conflict(
                "accepted bookings cannot be declined",
            )),
        }
    }
}

/// A booking as submitted by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub customer: NewCustomer,
    pub pickup_date: NaiveDate,
    pub payment_type: String,
    pub special_instruction: Option<String>,
    pub selection: ServiceSelection,
}

impl NewBooking {
    pub fn validated(self) -> DomainResult<Self> {
        let customer = self.customer.normalized()?;
        self.selection.validate()?;

        let payment_type = match self.payment_type.trim() {
            "" => "Cash".to_string(),
            other => other.to_string(),
        };
        let special_instruction = self
            .special_instruction
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            customer,
            pickup_date: self.pickup_date,
            payment_type,
            special_instruction,
            selection: self.selection,
        })
    }
}
