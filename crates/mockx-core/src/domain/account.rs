use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::domain::UtcDateTime;

/// One asset's holdings. `total` is always `free + used`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceEntry {
    free: f64,
    used: f64,
    total: f64,
}

impl BalanceEntry {
    pub fn new(free: f64, used: f64) -> Self {
        Self {
            free,
            used,
            total: free + used,
        }
    }

    pub const fn free(&self) -> f64 {
        self.free
    }

    pub const fn used(&self) -> f64 {
        self.used
    }

    pub const fn total(&self) -> f64 {
        self.total
    }
}

/// Canonical account balance: `{asset -> {free, used, total}}` plus `info`, `timestamp`
/// and `datetime`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    #[serde(flatten)]
    assets: BTreeMap<String, BalanceEntry>,
    pub timestamp: Option<i64>,
    pub datetime: Option<UtcDateTime>,
    pub info: Value,
}

impl Balance {
    pub fn new(
        assets: BTreeMap<String, BalanceEntry>,
        timestamp: Option<i64>,
        datetime: Option<UtcDateTime>,
        info: Value,
    ) -> Self {
        Self {
            assets,
            timestamp,
            datetime,
            info,
        }
    }

    pub fn get(&self, asset: &str) -> Option<&BalanceEntry> {
        self.assets.get(asset)
    }

    pub fn assets(&self) -> &BTreeMap<String, BalanceEntry> {
        &self.assets
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BalanceEntry)> {
        self.assets.iter().map(|(asset, entry)| (asset.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Narrows the balance to one asset; absent assets leave it empty.
    pub fn only(mut self, asset: &str) -> Self {
        self.assets.retain(|name, _| name == asset);
        self
    }
}

/// Assets the simulated venue holds balances for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceList {
    pub assets: Vec<String>,
    pub info: Value,
}

/// Result of a simulated deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub asset: String,
    pub amount: f64,
    pub info: Value,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entry_total_is_free_plus_used() {
        let entry = BalanceEntry::new(1.25, 0.75);
        assert_eq!(entry.total(), 2.0);
    }

    #[test]
    fn balance_serializes_assets_at_top_level() {
        let mut assets = BTreeMap::new();
        assets.insert(String::from("USDT"), BalanceEntry::new(90.0, 10.0));
        let balance = Balance::new(assets, None, None, json!({}));

        let rendered = serde_json::to_value(&balance).expect("serializes");

        assert_eq!(rendered["USDT"]["total"], 100.0);
        assert_eq!(rendered["USDT"]["used"], 10.0);
        assert!(rendered.get("info").is_some());
    }
}
