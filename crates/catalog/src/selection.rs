//! Name-based service selection shared by booking submission and walk-in orders.
//!
//! The dashboard and the booking form send catalog *names*; they are resolved
//! against active services and turned into priced line items.

use serde::{Deserialize, Serialize};

use laundry_core::{DomainError, DomainResult};

use crate::line::LineItem;
use crate::service::Service;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRequest {
    pub name: String,
    pub quantity: i64,
}

/// What the customer asked for, before prices are known.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceSelection {
    /// Number of loads; applied as the quantity of the bundle or each main service.
    pub load: i64,
    /// Bundle package name. Mutually exclusive with `main_services`.
    pub promo: Option<String>,
    pub main_services: Vec<String>,
    pub supplies: Vec<SupplyRequest>,
}

/// Result of resolving a selection against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PricedSelection {
    pub lines: Vec<LineItem>,
    /// Requested names with no active catalog entry. They are skipped.
    pub unresolved: Vec<String>,
}

impl ServiceSelection {
    pub fn validate(&self) -> DomainResult<()> {
        if self.load < 1 {
            return Err(DomainError::validation("load must be at least 1"));
        }
        if self.promo_name().is_some() && !self.main_service_names().is_empty() {
            return Err(DomainError::validation(
                "select either a promo bundle or main services, not both",
            ));
        }
        Ok(())
    }

    fn promo_name(&self) -> Option<&str> {
        self.promo.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn main_service_names(&self) -> Vec<&str> {
        self.main_services
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Bundle name if given, otherwise the main services.
    fn primary_names(&self) -> Vec<&str> {
        match self.promo_name() {
            Some(promo) => vec![promo],
            None => self.main_service_names(),
        }
    }

    fn supplies_with_quantity(&self) -> impl Iterator<Item = &SupplyRequest> {
        self.supplies
            .iter()
            .filter(|s| s.quantity > 0 && !s.name.trim().is_empty())
    }

    /// Every distinct name that needs a catalog lookup.
    pub fn requested_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let candidates = self
            .primary_names()
            .into_iter()
            .chain(self.supplies_with_quantity().map(|s| s.name.trim()));
        for name in candidates {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Build line items from the resolved catalog rows.
    ///
    /// Inactive rows are ignored. A service requested twice (e.g. as a main
    /// service and as a supply) becomes a single line with summed quantity.
    pub fn price(&self, catalog: &[Service]) -> PricedSelection {
        let mut priced = PricedSelection::default();

        let find = |name: &str| {
            catalog
                .iter()
                .find(|s| s.is_active && s.service_name == name)
        };

        let mut seen_primary: Vec<&str> = Vec::new();
        for name in self.primary_names() {
            if seen_primary.contains(&name) {
                continue;
            }
            seen_primary.push(name);
            match find(name) {
                Some(service) => priced.push(service, self.load),
                None => priced.unresolved.push(name.to_string()),
            }
        }

        for supply in self.supplies_with_quantity() {
            let name = supply.name.trim();
            match find(name) {
                Some(service) => priced.push(service, supply.quantity),
                None => priced.unresolved.push(name.to_string()),
            }
        }

        priced
    }
}

impl PricedSelection {
    fn push(&mut self, service: &Service, quantity: i64) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.service_id == service.service_id)
        {
            existing.quantity += quantity;
            return;
        }
        self.lines
            .push(LineItem::new(service.service_id, quantity, service.price));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceType;
    use laundry_core::{Money, ServiceId};

    fn service(id: i64, name: &str, price: i64, service_type: ServiceType) -> Service {
        Service {
            service_id: ServiceId::new(id),
            service_name: name.to_string(),
            price: Money::from_minor(price),
            unit_type: None,
            service_type,
            description: None,
            is_active: true,
        }
    }

    fn catalog() -> Vec<Service> {
        vec![
            service(1, "Wash", 6_000, ServiceType::MainService),
            service(2, "Dry", 6_000, ServiceType::MainService),
            service(3, "Detergent", 1_500, ServiceType::AddOnSupply),
            service(4, "Full Service Promo", 18_000, ServiceType::BundlePackage),
        ]
    }

    #[test]
    fn main_services_use_load_as_quantity() {
        let selection = ServiceSelection {
            load: 2,
            main_services: vec!["Wash".into(), "Dry".into()],
            ..Default::default()
        };
        let priced = selection.price(&catalog());
        assert_eq!(priced.lines.len(), 2);
        assert!(priced.lines.iter().all(|l| l.quantity == 2));
        assert!(priced.unresolved.is_empty());
    }

    #[test]
    fn supplies_keep_their_own_quantity_and_skip_zero() {
        let selection = ServiceSelection {
            load: 1,
            promo: Some("Full Service Promo".into()),
            supplies: vec![
                SupplyRequest { name: "Detergent".into(), quantity: 3 },
                SupplyRequest { name: "Fabric Softener".into(), quantity: 0 },
            ],
            ..Default::default()
        };
        let priced = selection.price(&catalog());
        assert_eq!(
            priced.lines,
            vec![
                LineItem::new(ServiceId::new(4), 1, Money::from_minor(18_000)),
                LineItem::new(ServiceId::new(3), 3, Money::from_minor(1_500)),
            ]
        );
        assert_eq!(selection.requested_names(), vec!["Full Service Promo", "Detergent"]);
    }

    #[test]
    fn inactive_and_unknown_names_are_reported_unresolved() {
        let mut services = catalog();
        services[1].is_active = false;
        let selection = ServiceSelection {
            load: 1,
            main_services: vec!["Dry".into(), "Iron".into()],
            ..Default::default()
        };
        let priced = selection.price(&services);
        assert!(priced.lines.is_empty());
        assert_eq!(priced.unresolved, vec!["Dry".to_string(), "Iron".to_string()]);
    }

    #[test]
    fn promo_and_main_services_together_are_rejected() {
        let selection = ServiceSelection {
            load: 1,
            promo: Some("Full Service Promo".into()),
            main_services: vec!["Wash".into()],
            ..Default::default()
        };
        assert!(matches!(selection.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn zero_load_is_rejected() {
        let selection = ServiceSelection { load: 0, ..Default::default() };
        assert!(selection.validate().is_err());
    }
}
