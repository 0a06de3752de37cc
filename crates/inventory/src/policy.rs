//! What to do when stock on hand does not cover a draw-down.

use std::collections::BTreeMap;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use laundry_core::{DomainError, DomainResult, InventoryItemId};

use crate::draw_down::DrawDown;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Subtract the full requirement; stock may go negative (backorder).
    #[default]
    AllowNegative,
    /// Subtract at most what is on hand; stock bottoms out at zero.
    ClampAtZero,
    /// Fail the transition when any item is short.
    Reject,
}

impl FromStr for StockPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow_negative" | "allow-negative" | "backorder" => Ok(StockPolicy::AllowNegative),
            "clamp" | "clamp_at_zero" => Ok(StockPolicy::ClampAtZero),
            "reject" => Ok(StockPolicy::Reject),
            other => Err(DomainError::validation(format!(
                "unknown stock policy '{other}' (expected allow_negative, clamp or reject)"
            ))),
        }
    }
}

/// One inventory write produced by applying a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub item_id: InventoryItemId,
    pub required: i64,
    /// Amount actually subtracted.
    pub deducted: i64,
    pub on_hand_before: i64,
}

impl StockAdjustment {
    pub fn on_hand_after(&self) -> i64 {
        self.on_hand_before - self.deducted
    }
}

impl StockPolicy {
    /// Turn a draw-down into inventory writes given current stock.
    ///
    /// Items missing from `on_hand` no longer exist and are skipped.
    pub fn plan(
        self,
        draw: &DrawDown,
        on_hand: &BTreeMap<InventoryItemId, i64>,
    ) -> DomainResult<Vec<StockAdjustment>> {
        let mut adjustments = Vec::with_capacity(draw.len());

        for (item_id, required) in draw.iter() {
            let Some(&before) = on_hand.get(&item_id) else {
                continue;
            };

            let deducted = match self {
                StockPolicy::AllowNegative => required,
                StockPolicy::ClampAtZero => required.min(before.max(0)),
                StockPolicy::Reject => {
                    if before < required {
                        return Err(DomainError::invariant(format!(
                            "insufficient stock for inventory item {item_id}: required {required}, on hand {before}"
                        )));
                    }
                    required
                }
            };
            if before.checked_sub(deducted).is_none() {
                return Err(DomainError::invariant(format!(
                    "stock for inventory item {item_id} would leave the representable range"
                )));
            }

            adjustments.push(StockAdjustment {
                item_id,
                required,
                deducted,
                on_hand_before: before,
            });
        }

        Ok(adjustments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_down::{ConsumingLine, SupplyLink};
    use laundry_catalog::ServiceType;
    use laundry_core::ServiceId;

    const ITEM: InventoryItemId = InventoryItemId::new(1);

    fn draw_of(quantity: i64) -> DrawDown {
        DrawDown::compute(
            &[ConsumingLine {
                service_id: ServiceId::new(5),
                service_type: ServiceType::AddOnSupply,
                quantity,
            }],
            &[SupplyLink {
                service_id: ServiceId::new(5),
                inventory_item_id: ITEM,
            }],
            &[],
        )
        .unwrap()
    }

    fn stock(quantity: i64) -> BTreeMap<InventoryItemId, i64> {
        BTreeMap::from([(ITEM, quantity)])
    }

    #[test]
    fn allow_negative_deducts_everything() {
        let plan = StockPolicy::AllowNegative.plan(&draw_of(5), &stock(2)).unwrap();
        assert_eq!(plan[0].deducted, 5);
        assert_eq!(plan[0].on_hand_after(), -3);
    }

    #[test]
    fn clamp_stops_at_zero() {
        let plan = StockPolicy::ClampAtZero.plan(&draw_of(5), &stock(2)).unwrap();
        assert_eq!(plan[0].deducted, 2);
        assert_eq!(plan[0].on_hand_after(), 0);

        let plan = StockPolicy::ClampAtZero.plan(&draw_of(5), &stock(-1)).unwrap();
        assert_eq!(plan[0].deducted, 0);
    }

    #[test]
    fn reject_fails_when_short() {
        let err = StockPolicy::Reject.plan(&draw_of(5), &stock(4)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(StockPolicy::Reject.plan(&draw_of(4), &stock(4)).is_ok());
    }

    #[test]
    fn missing_inventory_rows_are_skipped() {
        let plan = StockPolicy::Reject.plan(&draw_of(5), &BTreeMap::new()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("clamp".parse::<StockPolicy>().unwrap(), StockPolicy::ClampAtZero);
        assert_eq!("REJECT".parse::<StockPolicy>().unwrap(), StockPolicy::Reject);
        assert!("sometimes".parse::<StockPolicy>().is_err());
    }

    #[test]
    fn deduction_that_cannot_be_represented_is_rejected() {
        let err = StockPolicy::AllowNegative.plan(&draw_of(i64::MAX), &stock(-2)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
