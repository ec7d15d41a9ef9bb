use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Regime {
    #[serde(rename = "INIT")]
    Init,
    #[serde(rename = "CRITICAL ALPHA")]
    CriticalAlpha,
    #[serde(rename = "VOLATILITY SHOCK")]
    VolatilityShock,
    #[serde(rename = "LIQUIDITY EXPANSION")]
    LiquidityExpansion,
    #[serde(rename = "INSTITUTIONAL COMPRESSION")]
    InstitutionalCompression,
    #[serde(rename = "STABLE ACCUMULATION")]
    StableAccumulation,
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::CriticalAlpha => "CRITICAL ALPHA",
            Self::VolatilityShock => "VOLATILITY SHOCK",
            Self::LiquidityExpansion => "LIQUIDITY EXPANSION",
            Self::InstitutionalCompression => "INSTITUTIONAL COMPRESSION",
            Self::StableAccumulation => "STABLE ACCUMULATION",
        }
    }

    pub fn is_stressed(&self) -> bool {
        matches!(self, Self::CriticalAlpha | Self::VolatilityShock)
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Volatility/z-score cut-offs, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub shock: f64,
    pub expansion: f64,
    pub compression: f64,
    /// Sell-side z-score (as a positive magnitude) that turns a shock critical.
    pub panic_z: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            shock: 3.0,
            expansion: 1.5,
            compression: 0.5,
            panic_z: 1.2,
        }
    }
}

impl RegimeThresholds {
    pub fn classify(&self, volatility: f64, z_score: f64) -> Regime {
        if volatility > self.shock && z_score < -self.panic_z {
            Regime::CriticalAlpha
        } else if volatility > self.shock {
            Regime::VolatilityShock
        } else if volatility > self.expansion {
            Regime::LiquidityExpansion
        } else if volatility < self.compression {
            Regime::InstitutionalCompression
        } else {
            Regime::StableAccumulation
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.compression <= self.expansion && self.expansion <= self.shock && self.panic_z >= 0.0
    }
}
