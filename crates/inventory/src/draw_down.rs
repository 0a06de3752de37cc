//! Inventory required by an order's line items.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use laundry_catalog::{PackageInclude, ServiceType};
use laundry_core::{DomainError, DomainResult, InventoryItemId, ServiceId};

/// An order line together with the catalog type of its service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumingLine {
    pub service_id: ServiceId,
    pub service_type: ServiceType,
    pub quantity: i64,
}

/// Add-on supply service → the inventory row it is sold from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyLink {
    pub service_id: ServiceId,
    pub inventory_item_id: InventoryItemId,
}

/// Required quantity per inventory item, summed across every line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawDown {
    required: BTreeMap<InventoryItemId, i64>,
}

impl DrawDown {
    /// Add-on supplies draw `quantity` from their linked item; bundles draw
    /// `quantity × quantity_used` from each included item. Main services draw
    /// nothing.
    pub fn compute(
        lines: &[ConsumingLine],
        supply_links: &[SupplyLink],
        includes: &[PackageInclude],
    ) -> DomainResult<Self> {
        let mut draw = DrawDown::default();

        for line in lines {
            match line.service_type {
                ServiceType::AddOnSupply => {
                    for link in supply_links.iter().filter(|l| l.service_id == line.service_id) {
                        draw.add(link.inventory_item_id, line.quantity)?;
                    }
                }
                ServiceType::BundlePackage => {
                    for include in includes
                        .iter()
                        .filter(|i| i.bundle_service_id == line.service_id)
                    {
                        let quantity = line
                            .quantity
                            .checked_mul(include.quantity_used)
                            .ok_or_else(|| too_large(include.inventory_item_id))?;
                        draw.add(include.inventory_item_id, quantity)?;
                    }
                }
                ServiceType::MainService => {}
            }
        }

        draw.required.retain(|_, qty| *qty != 0);
        Ok(draw)
    }

    fn add(&mut self, item: InventoryItemId, quantity: i64) -> DomainResult<()> {
        let slot = self.required.entry(item).or_insert(0);
        *slot = slot.checked_add(quantity).ok_or_else(|| too_large(item))?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn required(&self, item: InventoryItemId) -> i64 {
        self.required.get(&item).copied().unwrap_or(0)
    }

    pub fn items(&self) -> impl Iterator<Item = InventoryItemId> + '_ {
        self.required.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InventoryItemId, i64)> + '_ {
        self.required.iter().map(|(k, v)| (*k, *v))
    }
}

fn too_large(item: InventoryItemId) -> DomainError {
    DomainError::validation(format!("required quantity for inventory item {item} is too large"))
}
