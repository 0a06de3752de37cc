//! Configuration loading and representation.
//!
//! Everything comes from environment variables; unset variables fall back to
//! defaults suitable for local development (in-memory store on port 8080).

use std::net::SocketAddr;

use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;

use laundry_inventory::StockPolicy;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// UTC+8.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 480;
pub const DEFAULT_PAGE_LIMIT_MAX: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Knobs the order workflows read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub stock_policy: StockPolicy,
    /// Offset used to decide the shop-local calendar day for order codes.
    pub utc_offset: FixedOffset,
    pub page_limit_max: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            stock_policy: StockPolicy::default(),
            utc_offset: offset_from_minutes(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(|| Utc.fix()),
            page_limit_max: DEFAULT_PAGE_LIMIT_MAX,
        }
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub workflow: WorkflowSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", e.to_string()))?;

        let database = match get("DATABASE_URL") {
            Some(url) => {
                let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
                    Some(raw) => raw
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ConfigError::invalid("DATABASE_MAX_CONNECTIONS", "expected a positive integer"))?,
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                Some(DatabaseConfig { url, max_connections })
            }
            None => None,
        };

        let stock_policy = match get("LAUNDRY_STOCK_POLICY") {
            Some(raw) => raw
                .parse::<StockPolicy>()
                .map_err(|e| ConfigError::invalid("LAUNDRY_STOCK_POLICY", e.message()))?,
            None => StockPolicy::default(),
        };

        let offset_minutes = match get("LAUNDRY_UTC_OFFSET_MINUTES") {
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|e| ConfigError::invalid("LAUNDRY_UTC_OFFSET_MINUTES", e.to_string()))?,
            None => DEFAULT_UTC_OFFSET_MINUTES,
        };
        let utc_offset = offset_from_minutes(offset_minutes).ok_or_else(|| {
            ConfigError::invalid("LAUNDRY_UTC_OFFSET_MINUTES", "must be within ±24h")
        })?;

        let page_limit_max = match get("LAUNDRY_PAGE_LIMIT_MAX") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::invalid("LAUNDRY_PAGE_LIMIT_MAX", "expected a positive integer"))?,
            None => DEFAULT_PAGE_LIMIT_MAX,
        };

        Ok(Self {
            bind_addr,
            database,
            workflow: WorkflowSettings {
                stock_policy,
                utc_offset,
                page_limit_max,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_select_in_memory_store() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(cfg.database.is_none());
        assert_eq!(cfg.workflow.stock_policy, StockPolicy::AllowNegative);
        assert_eq!(cfg.workflow.utc_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(cfg.workflow.page_limit_max, DEFAULT_PAGE_LIMIT_MAX);
    }

    #[test]
    fn database_url_enables_postgres() {
        let cfg = config(&[("DATABASE_URL", "postgres://localhost/laundry"), ("DATABASE_MAX_CONNECTIONS", "12")]).unwrap();
        assert_eq!(
            cfg.database,
            Some(DatabaseConfig {
                url: "postgres://localhost/laundry".into(),
                max_connections: 12
            })
        );
    }

    #[test]
    fn parses_workflow_knobs() {
        let cfg = config(&[
            ("LAUNDRY_STOCK_POLICY", "reject"),
            ("LAUNDRY_UTC_OFFSET_MINUTES", "-300"),
            ("LAUNDRY_PAGE_LIMIT_MAX", "25"),
        ])
        .unwrap();
        assert_eq!(cfg.workflow.stock_policy, StockPolicy::Reject);
        assert_eq!(cfg.workflow.utc_offset.local_minus_utc(), -300 * 60);
        assert_eq!(cfg.workflow.page_limit_max, 25);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            config(&[("LAUNDRY_STOCK_POLICY", "sometimes")]),
            Err(ConfigError::Invalid { var: "LAUNDRY_STOCK_POLICY", .. })
        ));
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
        assert!(config(&[("LAUNDRY_UTC_OFFSET_MINUTES", "100000")]).is_err());
        assert!(config(&[("LAUNDRY_PAGE_LIMIT_MAX", "0")]).is_err());
    }
}
