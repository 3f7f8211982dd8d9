use serde::{Deserialize, Serialize};

use setu_core::{DomainError, ValueObject};

/// Where an order ships to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl ValueObject for ShippingAddress {}

impl ShippingAddress {
    /// Validate and return a trimmed copy.
    ///
    /// Phone must be exactly 10 ASCII digits, pincode exactly 6.
    pub fn validated(&self) -> Result<ShippingAddress, DomainError> {
        let full_name = required("full_name", &self.full_name)?;
        let phone = required("phone", &self.phone)?;
        let address_line1 = required("address_line1", &self.address_line1)?;
        let city = required("city", &self.city)?;
        let state = required("state", &self.state)?;
        let pincode = required("pincode", &self.pincode)?;

        if !all_digits(&phone, 10) {
            return Err(DomainError::invalid_address("phone must be exactly 10 digits"));
        }
        if !all_digits(&pincode, 6) {
            return Err(DomainError::invalid_address("pincode must be exactly 6 digits"));
        }

        let address_line2 = self
            .address_line2
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(ShippingAddress {
            full_name,
            phone,
            address_line1,
            address_line2,
            city,
            state,
            pincode,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_address(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}
