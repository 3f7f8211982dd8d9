use serde::{Deserialize, Serialize};
use setu_core::DomainError;

use crate::order::OrderItem;

/// `price × quantity`, or `None` when it does not fit in a `u64`.
pub fn line_total(price: u64, quantity: u32) -> Option<u64> {
    price.checked_mul(u64::from(quantity))
}

/// `(original_price - price) × quantity`, or `None` when it does not fit in an `i64`.
pub fn line_savings(original_price: u64, price: u64, quantity: u32) -> Option<i64> {
    let original = i64::try_from(original_price).ok()?;
    let price = i64::try_from(price).ok()?;
    original.checked_sub(price)?.checked_mul(i64::from(quantity))
}

/// Order totals in the smallest currency unit.
///
/// Savings are signed: an item listed above its original price contributes a
/// negative saving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub total_amount: u64,
    pub total_savings: i64,
}

impl OrderTotals {
    pub fn of(items: &[OrderItem]) -> Result<Self, DomainError> {
        items.iter().try_fold(Self::default(), |acc, item| {
            acc.add_line(item.original_price, item.price, item.quantity)
        })
    }

    /// Fold one line into the running totals.
    pub fn add_line(self, original_price: u64, price: u64, quantity: u32) -> Result<Self, DomainError> {
        let total_amount = line_total(price, quantity)
            .and_then(|line| self.total_amount.checked_add(line))
            .ok_or_else(too_large)?;
        let total_savings = line_savings(original_price, price, quantity)
            .and_then(|line| self.total_savings.checked_add(line))
            .ok_or_else(too_large)?;
        Ok(Self {
            total_amount,
            total_savings,
        })
    }
}

fn too_large() -> DomainError {
    DomainError::invalid_request("order total is too large")
}
