use serde::Serialize;

use super::oscillator::GainLossAverages;
use super::regime::Regime;
use super::EngineConfig;
use crate::history::{BucketAggregator, RingBuffer};
use crate::indicator::rolling_mean::RollingMean;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickCounters {
    pub up: u64,
    pub down: u64,
}

/// Same-price ticks, attributed to a side by the oscillator bias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StealthCounters {
    pub buy: u64,
    pub sell: u64,
}

/// Trades by aggressor side, for transports that report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggressorCounters {
    pub buy: u64,
    pub sell: u64,
}

impl AggressorCounters {
    pub(crate) fn record(&mut self, taker_is_buyer: Option<bool>) {
        match taker_is_buyer {
            Some(true) => self.buy += 1,
            Some(false) => self.sell += 1,
            None => {}
        }
    }
}

/// Everything the engine carries from one tick to the next.
///
/// Owned by a single session; created fresh per subscription and passed by
/// value through [`StreamingStatsEngine::ingest`](super::StreamingStatsEngine::ingest).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub(crate) last_price: Option<f64>,
    pub(crate) variance: f64,
    pub(crate) averages: GainLossAverages,
    /// Oscillator as of the end of the previous tick.
    pub(crate) oscillator: f64,
    pub(crate) ticks: TickCounters,
    pub(crate) stealth: StealthCounters,
    pub(crate) aggressor: AggressorCounters,
    pub(crate) buckets: BucketAggregator,
    pub(crate) mean: RollingMean,
    pub(crate) regime: Regime,
    pub(crate) tick_count: u64,
}

impl EngineState {
    pub fn seeded(config: &EngineConfig) -> Self {
        Self {
            last_price: None,
            variance: config.variance_seed,
            averages: GainLossAverages::default(),
            oscillator: 0.0,
            ticks: TickCounters::default(),
            stealth: StealthCounters::default(),
            aggressor: AggressorCounters::default(),
            buckets: BucketAggregator::new(config.bucket_size, config.history_capacity),
            mean: RollingMean::new(config.mean_window),
            regime: Regime::Init,
            tick_count: 0,
        }
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn averages(&self) -> GainLossAverages {
        self.averages
    }

    pub fn oscillator(&self) -> f64 {
        self.oscillator
    }

    pub fn tick_counters(&self) -> TickCounters {
        self.ticks
    }

    pub fn stealth_counters(&self) -> StealthCounters {
        self.stealth
    }

    pub fn aggressor_counters(&self) -> AggressorCounters {
        self.aggressor
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn pending_bucket_ticks(&self) -> usize {
        self.buckets.pending()
    }

    pub fn price_history(&self) -> &RingBuffer<f64> {
        self.buckets.price_history()
    }

    pub fn oscillator_history(&self) -> &RingBuffer<f64> {
        self.buckets.oscillator_history()
    }
}
