use core::str::FromStr;

use serde::{Deserialize, Serialize};

use laundry_core::{DomainError, Entity, InventoryItemId, Money, ServiceId};

/// Kind of catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Washing/drying/folding work billed per load.
    MainService,
    /// A sellable supply tied 1:1 to an inventory item.
    AddOnSupply,
    /// A package that consumes several inventory items (see [`PackageInclude`]).
    BundlePackage,
}

impl ServiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::MainService => "main_service",
            ServiceType::AddOnSupply => "add_on_supply",
            ServiceType::BundlePackage => "bundle_package",
        }
    }
}

impl core::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main_service" => Ok(ServiceType::MainService),
            "add_on_supply" => Ok(ServiceType::AddOnSupply),
            "bundle_package" => Ok(ServiceType::BundlePackage),
            other => Err(DomainError::validation(format!("unknown service_type '{other}'"))),
        }
    }
}

/// Catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub service_id: ServiceId,
    pub service_name: String,
    /// Current list price; line items snapshot it at insertion time.
    pub price: Money,
    pub unit_type: Option<String>,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub is_active: bool,
}

impl Entity for Service {
    type Id = ServiceId;

    fn id(&self) -> ServiceId {
        self.service_id
    }
}

/// One inventory item consumed by a bundle, `quantity_used` per bundle sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInclude {
    pub bundle_service_id: ServiceId,
    pub inventory_item_id: InventoryItemId,
    pub quantity_used: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_round_trips_through_db_strings() {
        for t in [
            ServiceType::MainService,
            ServiceType::AddOnSupply,
            ServiceType::BundlePackage,
        ] {
            assert_eq!(t.as_str().parse::<ServiceType>().unwrap(), t);
        }
    }

    #[test]
    fn service_type_serializes_snake_case() {
        let json = serde_json::to_string(&ServiceType::BundlePackage).unwrap();
        assert_eq!(json, "\"bundle_package\"");
    }

    #[test]
    fn unknown_service_type_is_validation_error() {
        assert!(matches!(
            "dry_clean".parse::<ServiceType>(),
            Err(DomainError::Validation(_))
        ));
    }
}
