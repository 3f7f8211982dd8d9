//! Engine policies.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use setu_core::DomainError;
use setu_orders::OrderStatus;

/// Status a freshly placed order starts in. Applies to both creation paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialOrderStatus {
    #[default]
    Pending,
    Confirmed,
}

impl InitialOrderStatus {
    pub fn order_status(self) -> OrderStatus {
        match self {
            InitialOrderStatus::Pending => OrderStatus::Pending,
            InitialOrderStatus::Confirmed => OrderStatus::Confirmed,
        }
    }
}

impl FromStr for InitialOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InitialOrderStatus::Pending),
            "confirmed" => Ok(InitialOrderStatus::Confirmed),
            other => Err(DomainError::invalid_status(format!(
                "initial order status must be pending or confirmed, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_status: InitialOrderStatus,
    pub estimated_delivery_days: i64,
    /// Append a tracking entry whenever an agency changes the status.
    pub auto_track_status_changes: bool,
    /// Agencies may list only once their verification bundle is approved.
    pub require_verified_agency: bool,
    /// Suspended users are refused on every write.
    pub enforce_suspension: bool,
    pub recent_orders_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_status: InitialOrderStatus::Pending,
            estimated_delivery_days: 7,
            auto_track_status_changes: false,
            require_verified_agency: false,
            enforce_suspension: false,
            recent_orders_limit: 10,
        }
    }
}
