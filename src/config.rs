// Report configuration, read from `STOREFRONT_*` environment variables.
use std::path::PathBuf;

use chrono::{Local, NaiveDate};

use crate::error::{ReportError, Result};
use crate::reports::{Period, DEFAULT_TOP_PRODUCTS};
use crate::util::{parse_date_safe, parse_i64_safe};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// JSON export of order items with embedded product/category/order
    pub order_items_path: PathBuf,
    /// CSV export of orders (`id,total,status,created_at`)
    pub orders_path: PathBuf,
    /// CSV export of user profiles (`id,created_at`)
    pub profiles_path: PathBuf,
    /// Directory receiving the report CSV/JSON files
    pub output_dir: PathBuf,
    pub top_products: usize,
    pub period: Period,
    /// Reference date for "current year" and "current month"
    pub today: NaiveDate,
    /// Count only completed orders toward sales figures
    pub completed_only: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let top_products = match get("STOREFRONT_TOP_PRODUCTS") {
            Some(raw) => match parse_i64_safe(Some(&raw)) {
                Some(n) if n > 0 => n as usize,
                _ => {
                    return Err(ReportError::Config(format!(
                        "STOREFRONT_TOP_PRODUCTS must be a positive integer, got '{raw}'"
                    )))
                }
            },
            None => DEFAULT_TOP_PRODUCTS,
        };

        let period = match get("STOREFRONT_PERIOD") {
            Some(raw) => raw.parse()?,
            None => Period::Monthly,
        };

        let today = match get("STOREFRONT_TODAY") {
            Some(raw) => parse_date_safe(Some(&raw)).ok_or_else(|| {
                ReportError::Config(format!("STOREFRONT_TODAY must be YYYY-MM-DD, got '{raw}'"))
            })?,
            None => Local::now().date_naive(),
        };

        let completed_only = match get("STOREFRONT_COMPLETED_ONLY") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ReportError::Config(format!(
                    "STOREFRONT_COMPLETED_ONLY must be true or false, got '{raw}'"
                ))
            })?,
            None => true,
        };

        Ok(Self {
            order_items_path: get("STOREFRONT_ORDER_ITEMS")
                .unwrap_or_else(|| "order_items.json".into())
                .into(),
            orders_path: get("STOREFRONT_ORDERS")
                .unwrap_or_else(|| "orders.csv".into())
                .into(),
            profiles_path: get("STOREFRONT_PROFILES")
                .unwrap_or_else(|| "profiles.csv".into())
                .into(),
            output_dir: get("STOREFRONT_OUTPUT_DIR")
                .unwrap_or_else(|| ".".into())
                .into(),
            top_products,
            period,
            today,
            completed_only,
        })
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config_from(&[("STOREFRONT_TODAY", "2026-10-16")]).unwrap();
        assert_eq!(cfg.order_items_path, PathBuf::from("order_items.json"));
        assert_eq!(cfg.orders_path, PathBuf::from("orders.csv"));
        assert_eq!(cfg.profiles_path, PathBuf::from("profiles.csv"));
        assert_eq!(cfg.output_dir, PathBuf::from("."));
        assert_eq!(cfg.top_products, DEFAULT_TOP_PRODUCTS);
        assert_eq!(cfg.period, Period::Monthly);
        assert_eq!(cfg.today, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert!(cfg.completed_only);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config_from(&[
            ("STOREFRONT_TOP_PRODUCTS", "10"),
            ("STOREFRONT_PERIOD", "Yearly"),
            ("STOREFRONT_COMPLETED_ONLY", "no"),
            ("STOREFRONT_OUTPUT_DIR", "out"),
        ])
        .unwrap();
        assert_eq!(cfg.top_products, 10);
        assert_eq!(cfg.period, Period::Yearly);
        assert!(!cfg.completed_only);
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("STOREFRONT_TOP_PRODUCTS", "0")]),
            Err(ReportError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("STOREFRONT_PERIOD", "weekly")]),
            Err(ReportError::InvalidPeriod(_))
        ));
        assert!(matches!(
            config_from(&[("STOREFRONT_TODAY", "16/10/2026")]),
            Err(ReportError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("STOREFRONT_COMPLETED_ONLY", "maybe")]),
            Err(ReportError::Config(_))
        ));
    }
}
