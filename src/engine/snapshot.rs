use serde::{Deserialize, Serialize};

use super::regime::Regime;
use crate::history::BucketPoint;

/// Per-tick metrics handed to renderers. Rebuilt on every ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub price: f64,
    pub return_ratio: f64,
    pub variance: f64,
    pub volatility: f64,
    pub z_score: f64,
    pub oscillator: f64,
    pub risk_premium: f64,
    pub up_ticks: u64,
    pub down_ticks: u64,
    pub stealth_buy: u64,
    pub stealth_sell: u64,
    /// Trades whose taker was the buyer, counted only when the feed says so.
    pub aggressor_buys: u64,
    pub aggressor_sells: u64,
    pub regime: Regime,
    /// Percent distance of the price from its rolling mean.
    pub market_premium_pct: f64,
    /// Distance from the rolling mean in units of `mean * volatility`.
    pub deviation_sigma: f64,
    pub tick_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<BucketPoint>,
}

impl MetricsSnapshot {
    /// Share of directional ticks that were up-moves, 50 when there were none.
    pub fn buy_pressure_pct(&self) -> f64 {
        let total = self.up_ticks + self.down_ticks;
        if total == 0 {
            50.0
        } else {
            self.up_ticks as f64 / total as f64 * 100.0
        }
    }

    /// Share of stealth ticks attributed to buyers, 50 when there were none.
    pub fn stealth_buy_pct(&self) -> f64 {
        let total = self.stealth_buy + self.stealth_sell;
        if total == 0 {
            50.0
        } else {
            self.stealth_buy as f64 / total as f64 * 100.0
        }
    }

    pub fn bucket_flushed(&self) -> bool {
        self.bucket.is_some()
    }
}

/// Maps volatility onto a bounded display premium.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiskPremiumBand {
    pub floor: f64,
    pub ceiling: f64,
    pub slope: f64,
}

impl Default for RiskPremiumBand {
    fn default() -> Self {
        Self {
            floor: 0.02,
            ceiling: 0.06,
            slope: 0.02,
        }
    }
}

impl RiskPremiumBand {
    pub fn premium(&self, volatility: f64) -> f64 {
        (self.floor + self.slope * volatility).clamp(self.floor, self.ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_is_clamped_and_monotonic() {
        let band = RiskPremiumBand::default();
        assert!((band.premium(0.0) - 0.02).abs() < f64::EPSILON);
        assert!((band.premium(1.0) - 0.04).abs() < 1e-12);
        assert!((band.premium(50.0) - 0.06).abs() < f64::EPSILON);
        assert!(band.premium(0.5) <= band.premium(1.5));
    }
}
