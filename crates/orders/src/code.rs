//! Human-readable order codes.
//!
//! Format: `ORD` + `MM` + `DD` + `YY` + a 3-digit per-day sequence starting at
//! `001`, e.g. `ORD030524003` for the third order of 2024-03-05. Sequences past
//! 999 widen instead of wrapping.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use laundry_core::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    pub fn format(day: NaiveDate, sequence: u32) -> DomainResult<Self> {
        if sequence == 0 {
            return Err(DomainError::invariant("order code sequence starts at 1"));
        }
        Ok(Self(format!(
            "ORD{:02}{:02}{:02}{:03}",
            day.month(),
            day.day(),
            day.year().rem_euclid(100),
            sequence
        )))
    }

    /// Wrap a code read back from storage.
    pub fn from_stored(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for OrderCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calendar day in the shop's timezone.
pub fn shop_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}
