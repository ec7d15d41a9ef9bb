use crate::model::tick::Tick;

#[derive(Debug, Clone, PartialEq)]
pub enum WsConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32, delay_ms: u64 },
}

/// Events sent by feed workers to the session loop, in arrival order.
#[derive(Debug, Clone)]
pub enum AppEvent {
    MarketTick(Tick),
    WsStatus(WsConnectionStatus),
    /// A payload arrived but could not be turned into a tick.
    TickRejected { reason: String },
    /// The feed has no more ticks (end of a replay file).
    FeedExhausted,
    LogMessage(String),
    Error(String),
}
