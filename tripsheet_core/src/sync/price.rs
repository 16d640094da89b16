use crate::sync::models::DEFAULT_PRICE;
use serde::{Deserialize, Serialize};

/// Converts a local price cell into the traveller's currency for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRule {
    pub local_symbol: String,
    pub converted_symbol: String,
    /// Multiplier from local amount to converted amount.
    pub rate: f64,
}

impl Default for PriceRule {
    fn default() -> Self {
        Self {
            local_symbol: "¥".to_string(),
            converted_symbol: "$".to_string(),
            rate: 0.0067,
        }
    }
}

impl PriceRule {
    /// `"-"` stays `"-"`, tiers map symbol-for-symbol, single amounts are converted and
    /// rounded; anything else passes through.
    pub fn convert(&self, local: &str) -> String {
        let local = local.trim();
        if local.is_empty() || local == DEFAULT_PRICE {
            return DEFAULT_PRICE.to_string();
        }

        let tier = local.matches(self.local_symbol.as_str()).count();
        if tier > 0 && local.replace(self.local_symbol.as_str(), "").trim().is_empty() {
            return self.converted_symbol.repeat(tier);
        }

        let digits: String = local
            .trim_start_matches(self.local_symbol.as_str())
            .chars()
            .filter(|c| *c != ',')
            .collect();
        match digits.trim().parse::<f64>() {
            Ok(amount) if amount.is_finite() && amount >= 0.0 => {
                format!("~{}{:.0}", self.converted_symbol, amount * self.rate)
            }
            _ => local.to_string(),
        }
    }

    /// Local price text for a provider price tier.
    pub fn from_level(&self, level: u8) -> String {
        match level {
            0 => "Free".to_string(),
            n => self.local_symbol.repeat(n.min(4) as usize),
        }
    }
}
