use serde::{Deserialize, Serialize};

use laundry_core::{CustomerId, DomainError, DomainResult, Entity};

/// Persisted customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> CustomerId {
        self.customer_id
    }
}

/// Customer details as submitted with a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Strip whitespace so "0917 123 4567" and "09171234567" are one customer.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

impl NewCustomer {
    /// Validate and normalise the submitted fields.
    pub fn normalized(self) -> DomainResult<Self> {
        let name = self.name.trim().to_string();
        let phone_number = normalize_phone(&self.phone_number);

        if name.is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if phone_number.is_empty() {
            return Err(DomainError::validation("phone_number is required"));
        }

        Ok(Self {
            name,
            phone_number,
            email: non_blank(self.email),
            address: non_blank(self.address),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Outcome of the find-or-create lookup by phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerResolution {
    /// A customer with this phone already exists; its stored details win.
    Existing(Customer),
    /// No match; insert this one.
    Create(NewCustomer),
}

impl CustomerResolution {
    pub fn decide(existing: Option<Customer>, submitted: NewCustomer) -> Self {
        match existing {
            Some(customer) => CustomerResolution::Existing(customer),
            None => CustomerResolution::Create(submitted),
        }
    }
}
