use crate::sync::models::IdStrategy;
use crate::sync::price::PriceRule;
use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for one sync invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub locations_tab: String,
    pub itinerary_tab: String,
    /// Hard cap on lookups performed per invocation.
    pub enrich_max_items: usize,
    /// Execution ceiling imposed by the hosting runtime.
    pub execution_ceiling: Duration,
    /// Fraction of `execution_ceiling` the enrichment loop may consume.
    pub enrich_budget_ratio: f64,
    pub id_strategy: IdStrategy,
    pub price: PriceRule,
    pub owner_locks: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            locations_tab: "Locations".to_string(),
            itinerary_tab: "Itinerary".to_string(),
            enrich_max_items: 3,
            execution_ceiling: Duration::from_millis(10_000),
            enrich_budget_ratio: 0.6,
            id_strategy: IdStrategy::Positional,
            price: PriceRule::default(),
            owner_locks: false,
        }
    }
}

impl SyncConfig {
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, file, test map).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let locations_tab = get("TRIPSHEET_LOCATIONS_TAB").unwrap_or(defaults.locations_tab);
        let itinerary_tab = get("TRIPSHEET_ITINERARY_TAB").unwrap_or(defaults.itinerary_tab);

        let enrich_max_items = match get("TRIPSHEET_ENRICH_MAX_ITEMS") {
            Some(v) => v.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!("TRIPSHEET_ENRICH_MAX_ITEMS is not a number: {v}"))
            })?,
            None => defaults.enrich_max_items,
        };
        let ceiling_ms = match get("TRIPSHEET_EXECUTION_CEILING_MS") {
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "TRIPSHEET_EXECUTION_CEILING_MS is not a number: {v}"
                ))
            })?,
            None => defaults.execution_ceiling.as_millis() as u64,
        };
        let enrich_budget_ratio = match get("TRIPSHEET_ENRICH_BUDGET_RATIO") {
            Some(v) => v.trim().parse::<f64>().map_err(|_| {
                Error::Config(format!("TRIPSHEET_ENRICH_BUDGET_RATIO is not a number: {v}"))
            })?,
            None => defaults.enrich_budget_ratio,
        };
        let id_strategy = match get("TRIPSHEET_ID_STRATEGY") {
            Some(v) => IdStrategy::parse(&v).ok_or_else(|| {
                Error::Config(format!(
                    "TRIPSHEET_ID_STRATEGY must be 'positional' or 'content_hash', got '{v}'"
                ))
            })?,
            None => defaults.id_strategy,
        };
        let mut price = defaults.price;
        if let Some(v) = get("TRIPSHEET_PRICE_RATE") {
            price.rate = v.trim().parse::<f64>().map_err(|_| {
                Error::Config(format!("TRIPSHEET_PRICE_RATE is not a number: {v}"))
            })?;
        }
        let owner_locks = get("TRIPSHEET_OWNER_LOCKS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.owner_locks);

        let cfg = Self {
            locations_tab,
            itinerary_tab,
            enrich_max_items,
            execution_ceiling: Duration::from_millis(ceiling_ms),
            enrich_budget_ratio,
            id_strategy,
            price,
            owner_locks,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    #[tracing::instrument(level = "debug")]
    pub fn validate(&self) -> Result<()> {
        if self.locations_tab.trim().is_empty() {
            return Err(Error::Config("locations_tab is empty".to_string()));
        }
        if self.itinerary_tab.trim().is_empty() {
            return Err(Error::Config("itinerary_tab is empty".to_string()));
        }
        if self.locations_tab == self.itinerary_tab {
            return Err(Error::Config(
                "locations_tab and itinerary_tab must differ".to_string(),
            ));
        }
        if self.enrich_max_items == 0 {
            return Err(Error::Config("enrich_max_items must be > 0".to_string()));
        }
        if self.execution_ceiling.is_zero() {
            return Err(Error::Config("execution_ceiling must be > 0".to_string()));
        }
        if !(self.enrich_budget_ratio > 0.0 && self.enrich_budget_ratio <= 1.0) {
            return Err(Error::Config(
                "enrich_budget_ratio must be in (0, 1]".to_string(),
            ));
        }
        if !(self.price.rate.is_finite() && self.price.rate > 0.0) {
            return Err(Error::Config("price rate must be > 0".to_string()));
        }
        Ok(())
    }

    /// Soft wall-clock threshold for the enrichment loop.
    pub fn enrich_budget(&self) -> Duration {
        self.execution_ceiling.mul_f64(self.enrich_budget_ratio)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// SQLite file backing the snapshot cache.
    pub cache_db: PathBuf,
}

impl StoreConfig {
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        let cache_db = std::env::var("TRIPSHEET_CACHE_DB")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/tripsheet_cache.db"));
        Ok(Self { cache_db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, SyncConfig::default());
        assert_eq!(cfg.enrich_budget(), Duration::from_millis(6_000));
    }

    #[test]
    fn reads_overrides() {
        let cfg = SyncConfig::from_lookup(lookup(&[
            ("TRIPSHEET_ENRICH_MAX_ITEMS", "5"),
            ("TRIPSHEET_EXECUTION_CEILING_MS", "60000"),
            ("TRIPSHEET_ENRICH_BUDGET_RATIO", "0.7"),
            ("TRIPSHEET_ID_STRATEGY", "content_hash"),
            ("TRIPSHEET_OWNER_LOCKS", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.enrich_max_items, 5);
        assert_eq!(cfg.id_strategy, IdStrategy::ContentHash);
        assert!(cfg.owner_locks);
        assert_eq!(cfg.enrich_budget(), Duration::from_millis(42_000));
    }

    #[test]
    fn rejects_invalid_values() {
        for pairs in [
            [("TRIPSHEET_ENRICH_MAX_ITEMS", "0")],
            [("TRIPSHEET_ENRICH_MAX_ITEMS", "many")],
            [("TRIPSHEET_ENRICH_BUDGET_RATIO", "1.5")],
            [("TRIPSHEET_ID_STRATEGY", "uuid")],
            [("TRIPSHEET_ITINERARY_TAB", "Locations")],
        ] {
            let err = SyncConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{pairs:?} -> {err}");
        }
    }
}
