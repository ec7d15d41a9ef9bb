use crate::engine::{EngineState, MetricsSnapshot, StreamingStatsEngine};
use crate::event::{AppEvent, WsConnectionStatus};
use crate::model::tick::Tick;

/// Owns the engine state for one live subscription.
///
/// State is discarded whenever the transport reconnects so that counters and
/// variance never leak across connections.
#[derive(Debug)]
pub struct FeedSession {
    symbol: String,
    engine: StreamingStatsEngine,
    state: EngineState,
    last_snapshot: Option<MetricsSnapshot>,
    resets: u32,
    awaiting_reconnect: bool,
}

impl FeedSession {
    pub fn new(symbol: &str, engine: StreamingStatsEngine) -> Self {
        let state = engine.seed_state();
        Self {
            symbol: symbol.to_string(),
            engine,
            state,
            last_snapshot: None,
            resets: 0,
            awaiting_reconnect: false,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn on_tick(&mut self, tick: &Tick) -> MetricsSnapshot {
        let state = std::mem::replace(&mut self.state, self.engine.seed_state());
        let (state, snapshot) = self.engine.ingest(state, tick);
        self.state = state;
        self.last_snapshot = Some(snapshot.clone());
        snapshot
    }

    /// Apply one feed event in arrival order. Returns a snapshot for ticks.
    ///
    /// Ticks and status changes share one channel, so a tick from a new
    /// connection is always preceded by the `Connected` that resets state.
    pub fn on_event(&mut self, event: &AppEvent) -> Option<MetricsSnapshot> {
        match event {
            AppEvent::MarketTick(tick) => Some(self.on_tick(tick)),
            AppEvent::WsStatus(status) => {
                self.on_status(status);
                None
            }
            _ => None,
        }
    }

    /// Drop all accumulated state and reseed.
    pub fn reset(&mut self) {
        self.state = self.engine.seed_state();
        self.last_snapshot = None;
        self.resets += 1;
        tracing::info!(symbol = %self.symbol, resets = self.resets, "Engine state reset");
    }

    /// Track transport status. A connection that follows a disconnect starts
    /// a new session.
    pub fn on_status(&mut self, status: &WsConnectionStatus) {
        match status {
            WsConnectionStatus::Connected => {
                if self.awaiting_reconnect {
                    self.awaiting_reconnect = false;
                    self.reset();
                }
            }
            WsConnectionStatus::Disconnected | WsConnectionStatus::Reconnecting { .. } => {
                self.awaiting_reconnect = true;
            }
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn last_snapshot(&self) -> Option<&MetricsSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn price_history(&self) -> Vec<f64> {
        self.state.price_history().to_vec()
    }

    pub fn oscillator_history(&self) -> Vec<f64> {
        self.state.oscillator_history().to_vec()
    }

    pub fn history_capacity(&self) -> usize {
        self.state.price_history().capacity()
    }
}
