use core::str::FromStr;

use serde::{Deserialize, Serialize};

use laundry_core::DomainError;

/// Order status lifecycle.
///
/// `Stand By → Processing → Ready → Completed`, with `Cancelled` reachable
/// only from `Stand By`. Completed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Stand By")]
    StandBy,
    Processing,
    Ready,
    Completed,
    Cancelled,
}

/// Side effect the caller must apply after a successful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    None,
    /// Entered Processing: deduct the order's supplies and bundle contents.
    DrawInventory,
    /// Entered Completed: `completion_date` was stamped.
    Completed,
    /// Cancelled with money on file: payment status moved to Refunded.
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::StandBy,
        OrderStatus::Processing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::StandBy => "Stand By",
            OrderStatus::Processing => "Processing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Position along the forward path. Cancelled sits outside of it.
    fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::StandBy => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::Completed => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// Whether `self → to` is a legal move, ignoring payment.
    pub fn check_move(self, to: OrderStatus) -> Result<(), DomainError> {
        if self == to {
            return Err(DomainError::validation(format!("order is already {self}")));
        }
        if self.is_terminal() {
            return Err(DomainError::validation(format!(
                "order is {self}; its status can no longer change"
            )));
        }
        if to == OrderStatus::Cancelled {
            if self != OrderStatus::StandBy {
                return Err(DomainError::validation(
                    "only orders in Stand By can be cancelled",
                ));
            }
            return Ok(());
        }
        match (self.rank(), to.rank()) {
            (Some(from), Some(target)) if target > from => Ok(()),
            _ => Err(DomainError::validation(format!(
                "cannot move order back from {self} to {to}"
            ))),
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "standby" => Ok(OrderStatus::StandBy),
            "processing" => Ok(OrderStatus::Processing),
            "ready" => Ok(OrderStatus::Ready),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(DomainError::validation(format!("invalid order status '{}'", s.trim()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn parses_display_names_and_loose_spellings() {
        assert_eq!("Stand By".parse::<OrderStatus>().unwrap(), StandBy);
        assert_eq!("stand_by".parse::<OrderStatus>().unwrap(), StandBy);
        assert_eq!("READY".parse::<OrderStatus>().unwrap(), Ready);
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn forward_moves_including_skips_are_allowed() {
        assert!(StandBy.check_move(Processing).is_ok());
        assert!(StandBy.check_move(Ready).is_ok());
        assert!(Processing.check_move(Completed).is_ok());
    }

    #[test]
    fn backward_and_repeated_moves_are_rejected() {
        assert!(Ready.check_move(Processing).is_err());
        assert!(Processing.check_move(StandBy).is_err());
        assert!(Ready.check_move(Ready).is_err());
    }

    #[test]
    fn cancel_only_from_stand_by() {
        assert!(StandBy.check_move(Cancelled).is_ok());
        assert!(Processing.check_move(Cancelled).is_err());
        assert!(Ready.check_move(Cancelled).is_err());
    }

    #[test]
    fn terminal_states_never_move() {
        for to in OrderStatus::ALL {
            assert!(Completed.check_move(to).is_err());
            assert!(Cancelled.check_move(to).is_err());
        }
    }

    #[test]
    fn serde_uses_display_names() {
        assert_eq!(serde_json::to_string(&StandBy).unwrap(), "\"Stand By\"");
        let parsed: OrderStatus = serde_json::from_str("\"Cancelled\"").unwrap();
        assert_eq!(parsed, Cancelled);
    }
}
