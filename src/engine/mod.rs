pub mod oscillator;
pub mod regime;
pub mod snapshot;
pub mod state;
pub mod variance;

use serde::Deserialize;

use crate::error::AppError;
use crate::model::tick::Tick;

pub use oscillator::GainLossAverages;
pub use regime::{Regime, RegimeThresholds};
pub use snapshot::{MetricsSnapshot, RiskPremiumBand};
pub use state::{AggressorCounters, EngineState, StealthCounters, TickCounters};
pub use variance::VarianceModel;

/// When the tick and stealth counters go back to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterReset {
    /// Counters accumulate for the lifetime of the subscription.
    #[default]
    Cumulative,
    /// Counters are cleared each time a bucket is flushed.
    PerBucket,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub variance_seed: f64,
    pub variance: VarianceModel,
    pub oscillator_period: usize,
    /// Floor for every denominator (z-score, relative strength, deviation).
    pub eps: f64,
    pub bucket_size: usize,
    pub history_capacity: usize,
    pub mean_window: usize,
    pub counter_reset: CounterReset,
    pub regime: RegimeThresholds,
    pub risk_premium: RiskPremiumBand,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            variance_seed: 0.0001,
            variance: VarianceModel::default(),
            oscillator_period: 14,
            eps: 0.001,
            bucket_size: 12,
            history_capacity: 30,
            mean_window: 100,
            counter_reset: CounterReset::default(),
            regime: RegimeThresholds::default(),
            risk_premium: RiskPremiumBand::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.variance_seed.is_finite() && self.variance_seed > 0.0) {
            return Err(AppError::Config(format!(
                "engine.variance_seed must be positive, got {}",
                self.variance_seed
            )));
        }
        self.variance.validate()?;
        if self.oscillator_period < 2 {
            return Err(AppError::Config(format!(
                "engine.oscillator_period must be >= 2, got {}",
                self.oscillator_period
            )));
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(AppError::Config(format!(
                "engine.eps must be positive, got {}",
                self.eps
            )));
        }
        if self.bucket_size == 0 {
            return Err(AppError::Config("engine.bucket_size must be > 0".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(AppError::Config(
                "engine.history_capacity must be > 0".to_string(),
            ));
        }
        if self.mean_window == 0 {
            return Err(AppError::Config("engine.mean_window must be > 0".to_string()));
        }
        if !self.regime.is_ordered() {
            return Err(AppError::Config(
                "engine.regime thresholds must satisfy compression <= expansion <= shock"
                    .to_string(),
            ));
        }
        let band = &self.risk_premium;
        let finite = band.floor.is_finite() && band.ceiling.is_finite() && band.slope.is_finite();
        if !finite || band.floor > band.ceiling || band.slope < 0.0 {
            return Err(AppError::Config(format!(
                "engine.risk_premium band is invalid (floor={}, ceiling={}, slope={})",
                band.floor, band.ceiling, band.slope
            )));
        }
        Ok(())
    }
}

/// Incremental per-tick statistics: variance, z-score, oscillator, tick and
/// stealth counters, bucketed histories, regime.
///
/// The engine holds only configuration; all mutable data lives in
/// [`EngineState`], so ingesting the same state and tick always yields the
/// same result.
#[derive(Debug, Clone)]
pub struct StreamingStatsEngine {
    config: EngineConfig,
}

impl StreamingStatsEngine {
    pub fn new(config: EngineConfig) -> Result<Self, AppError> {
        config.validate()?;
        if !config.variance.is_mean_reverting() {
            tracing::warn!(model = ?config.variance, "Variance model is not mean-reverting");
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh state for a new subscription.
    pub fn seed_state(&self) -> EngineState {
        EngineState::seeded(&self.config)
    }

    pub fn ingest(&self, mut state: EngineState, tick: &Tick) -> (EngineState, MetricsSnapshot) {
        let cfg = &self.config;
        let price = tick.price;
        state.tick_count += 1;
        state.aggressor.record(tick.taker_is_buyer);

        let prev = match state.last_price.replace(price) {
            Some(prev) if prev != 0.0 => prev,
            // First tick, or a zero reference price: only the anchor moves.
            _ => {
                let snapshot = self.idle_snapshot(&state, price);
                return (state, snapshot);
            }
        };

        let diff = price - prev;
        let return_ratio = diff / prev;
        let bias = state.oscillator;

        state.variance = cfg
            .variance
            .next(state.variance, diff, return_ratio, cfg.eps)
            .max(0.0);
        let volatility = state.variance.sqrt();
        let z_score = diff / volatility.max(cfg.eps);
        let risk_premium = cfg.risk_premium.premium(volatility);

        if diff > 0.0 {
            state.ticks.up += 1;
        } else if diff < 0.0 {
            state.ticks.down += 1;
        } else if bias > 50.0 {
            state.stealth.buy += 1;
        } else {
            state.stealth.sell += 1;
        }

        state.averages = state.averages.update(diff, cfg.oscillator_period);
        state.oscillator = state.averages.value(cfg.eps);

        let mean = state.mean.push(price);
        let market_premium_pct = if mean.abs() > 0.0 {
            (price - mean) / mean * 100.0
        } else {
            0.0
        };
        let deviation_sigma = (price - mean) / (mean * volatility).max(cfg.eps);

        let bucket = state.buckets.push(price, state.oscillator);
        if bucket.is_some() && cfg.counter_reset == CounterReset::PerBucket {
            state.ticks = TickCounters::default();
            state.stealth = StealthCounters::default();
            state.aggressor = AggressorCounters::default();
        }

        state.regime = cfg.regime.classify(volatility, z_score);

        let snapshot = MetricsSnapshot {
            price,
            return_ratio,
            variance: state.variance,
            volatility,
            z_score,
            oscillator: state.oscillator,
            risk_premium,
            up_ticks: state.ticks.up,
            down_ticks: state.ticks.down,
            stealth_buy: state.stealth.buy,
            stealth_sell: state.stealth.sell,
            aggressor_buys: state.aggressor.buy,
            aggressor_sells: state.aggressor.sell,
            regime: state.regime,
            market_premium_pct,
            deviation_sigma,
            tick_count: state.tick_count,
            bucket,
        };
        (state, snapshot)
    }

    /// Snapshot for a tick that carried no usable delta.
    fn idle_snapshot(&self, state: &EngineState, price: f64) -> MetricsSnapshot {
        let volatility = state.variance.sqrt();
        MetricsSnapshot {
            price,
            return_ratio: 0.0,
            variance: state.variance,
            volatility,
            z_score: 0.0,
            oscillator: state.oscillator,
            risk_premium: self.config.risk_premium.premium(volatility),
            up_ticks: state.ticks.up,
            down_ticks: state.ticks.down,
            stealth_buy: state.stealth.buy,
            stealth_sell: state.stealth.sell,
            aggressor_buys: state.aggressor.buy,
            aggressor_sells: state.aggressor.sell,
            regime: state.regime,
            market_premium_pct: 0.0,
            deviation_sigma: 0.0,
            tick_count: state.tick_count,
            bucket: None,
        }
    }
}
