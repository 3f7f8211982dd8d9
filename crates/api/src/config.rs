//! Process configuration from the environment.
//!
//! An optional `.env` file is loaded first by `main`.

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use setu_infra::{EngineConfig, InitialOrderStatus};

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub engine: EngineConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let defaults = EngineConfig::default();
        let mut engine = EngineConfig {
            initial_status: parsed(&lookup, "INITIAL_ORDER_STATUS", defaults.initial_status, |v| {
                InitialOrderStatus::from_str(v).map_err(anyhow::Error::from)
            })?,
            estimated_delivery_days: parsed(&lookup, "ESTIMATED_DELIVERY_DAYS", defaults.estimated_delivery_days, |v| {
                v.parse().map_err(anyhow::Error::from)
            })?,
            auto_track_status_changes: parsed(&lookup, "AUTO_TRACK_STATUS_CHANGES", defaults.auto_track_status_changes, flag)?,
            require_verified_agency: parsed(&lookup, "REQUIRE_VERIFIED_AGENCY", defaults.require_verified_agency, flag)?,
            enforce_suspension: parsed(&lookup, "ENFORCE_SUSPENSION", defaults.enforce_suspension, flag)?,
            recent_orders_limit: parsed(&lookup, "RECENT_ORDERS_LIMIT", defaults.recent_orders_limit, |v| {
                v.parse().map_err(anyhow::Error::from)
            })?,
        };

        if !(0..=365).contains(&engine.estimated_delivery_days) {
            bail!("ESTIMATED_DELIVERY_DAYS must be between 0 and 365");
        }
        if engine.recent_orders_limit == 0 {
            engine.recent_orders_limit = defaults.recent_orders_limit;
        }

        Ok(Self {
            bind_addr,
            jwt_secret,
            engine,
        })
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => parse(raw.trim()).with_context(|| format!("invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}

fn flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use setu_orders::OrderStatus;

    use super::*;

    fn from(pairs: &[(&str, &str)]) -> Result<ApiConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.engine, EngineConfig::default());
    }

    #[test]
    fn policies_are_read() {
        let cfg = from(&[
            ("INITIAL_ORDER_STATUS", "confirmed"),
            ("AUTO_TRACK_STATUS_CHANGES", "true"),
            ("ENFORCE_SUSPENSION", "1"),
            ("ESTIMATED_DELIVERY_DAYS", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.engine.initial_status.order_status(), OrderStatus::Confirmed);
        assert!(cfg.engine.auto_track_status_changes);
        assert!(cfg.engine.enforce_suspension);
        assert!(!cfg.engine.require_verified_agency);
        assert_eq!(cfg.engine.estimated_delivery_days, 3);
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(from(&[("INITIAL_ORDER_STATUS", "shipped")]).is_err());
        assert!(from(&[("ENFORCE_SUSPENSION", "maybe")]).is_err());
        assert!(from(&[("ESTIMATED_DELIVERY_DAYS", "-1")]).is_err());
        assert!(from(&[("BIND_ADDR", "nowhere")]).is_err());
    }
}
