use serde::{Deserialize, Serialize};

use laundry_core::{Entity, InventoryItemId, ServiceId};

/// A stocked item (detergent sachets, softener, plastic bags, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: InventoryItemId,
    pub item_name: String,
    /// Units on hand. May be negative under [`crate::StockPolicy::AllowNegative`].
    pub quantity: i64,
    /// Add-on supply service sold 1:1 from this row, if any.
    pub service_id: Option<ServiceId>,
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> InventoryItemId {
        self.item_id
    }
}

impl InventoryItem {
    pub fn is_backordered(&self) -> bool {
        self.quantity < 0
    }
}
