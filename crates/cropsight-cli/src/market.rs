//! Static market price listing served next to the crop recommender.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub crop: String,
    pub price: String,
    pub unit: String,
    pub change: String,
    pub trending: Trend,
}

impl MarketPrice {
    fn per_kg(crop: &str, price: &str, change: &str, trending: Trend) -> Self {
        Self {
            crop: crop.to_string(),
            price: price.to_string(),
            unit: "per kg".to_string(),
            change: change.to_string(),
            trending,
        }
    }
}

/// The fixed five-entry listing, always in the same order.
pub fn market_prices() -> Vec<MarketPrice> {
    vec![
        MarketPrice::per_kg("Tomato", "₹25", "+5%", Trend::Up),
        MarketPrice::per_kg("Onion", "₹30", "-2%", Trend::Down),
        MarketPrice::per_kg("Potato", "₹20", "+3%", Trend::Up),
        MarketPrice::per_kg("Rice", "₹45", "0%", Trend::Stable),
        MarketPrice::per_kg("Wheat", "₹25", "+1%", Trend::Up),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_order() {
        let crops: Vec<_> = market_prices().into_iter().map(|p| p.crop).collect();
        assert_eq!(crops, vec!["Tomato", "Onion", "Potato", "Rice", "Wheat"]);
    }

    #[test]
    fn test_trend_serializes_lowercase() {
        let json = serde_json::to_value(&market_prices()[3]).unwrap();
        assert_eq!(json["trending"], "stable");
        assert_eq!(json["unit"], "per kg");
        assert_eq!(json["price"], "₹45");
    }
}
