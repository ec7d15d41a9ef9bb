use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;

use super::types::BinanceTradeEvent;
use crate::event::{AppEvent, WsConnectionStatus};

/// Reconnect delay policy. With `initial == max` (the default) this is a
/// fixed delay.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    current: Duration,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        let max = max.max(initial);
        Self {
            current: initial,
            initial,
            max,
            factor: factor.max(1.0),
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay, 1.0)
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[derive(Debug, Clone)]
pub struct BinanceWsClient {
    url: String,
    backoff: ReconnectBackoff,
}

impl BinanceWsClient {
    /// `symbol` is subscribed to as `<symbol>@trade`.
    pub fn new(ws_base_url: &str, symbol: &str, backoff: ReconnectBackoff) -> Self {
        Self {
            url: format!(
                "{}/{}@trade",
                ws_base_url.trim_end_matches('/'),
                symbol.trim().to_ascii_lowercase()
            ),
            backoff,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect and run the WebSocket loop with automatic reconnection.
    /// Status changes and ticks go out on the same channel, so `Connected`
    /// always precedes the ticks of the connection it announces.
    pub async fn connect_and_run(
        &self,
        app_tx: mpsc::Sender<AppEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut backoff = self.backoff.clone();
        let mut attempt: u32 = 0;
        let mut dropped: u64 = 0;

        loop {
            attempt += 1;
            match self
                .connect_once(&app_tx, &mut shutdown, &mut backoff, &mut dropped)
                .await
            {
                Ok(()) => {
                    // Clean shutdown requested
                    let _ = app_tx
                        .send(AppEvent::WsStatus(WsConnectionStatus::Disconnected))
                        .await;
                    break;
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, attempt, error = %e, "WebSocket session ended");
                    let _ = app_tx
                        .send(AppEvent::WsStatus(WsConnectionStatus::Disconnected))
                        .await;
                    let _ = app_tx
                        .send(AppEvent::LogMessage(format!("WS error: {}", e)))
                        .await;

                    let delay = backoff.next_delay();
                    let _ = app_tx
                        .send(AppEvent::WsStatus(WsConnectionStatus::Reconnecting {
                            attempt,
                            delay_ms: delay.as_millis() as u64,
                        }))
                        .await;

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue,
                        _ = shutdown.changed() => {
                            let _ = app_tx
                                .send(AppEvent::LogMessage("Shutdown during reconnect".to_string()))
                                .await;
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn connect_once(
        &self,
        app_tx: &mpsc::Sender<AppEvent>,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut ReconnectBackoff,
        dropped: &mut u64,
    ) -> Result<()> {
        let _ = app_tx
            .send(AppEvent::LogMessage(format!("Connecting to {}", self.url)))
            .await;

        let (ws_stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .context("WebSocket connect failed")?;

        backoff.reset();
        let _ = app_tx
            .send(AppEvent::WsStatus(WsConnectionStatus::Connected))
            .await;
        tracing::info!(url = %self.url, "WebSocket connected");

        let (_write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            let tick = serde_json::from_str::<BinanceTradeEvent>(&text)
                                .map_err(anyhow::Error::from)
                                .and_then(|event| event.into_tick().map_err(anyhow::Error::from));
                            match tick {
                                Ok(tick) => {
                                    if app_tx.try_send(AppEvent::MarketTick(tick)).is_err() {
                                        *dropped += 1;
                                        tracing::warn!(
                                            dropped = *dropped,
                                            "Event channel full, dropping tick"
                                        );
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!(error = %e, "Failed to decode WS message");
                                    let _ = app_tx.try_send(AppEvent::TickRejected {
                                        reason: e.to_string(),
                                    });
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Ping(_))) => {
                            // tokio-tungstenite handles pong automatically
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            return Err(anyhow::anyhow!("WebSocket closed by server: {:?}", frame));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(anyhow::anyhow!("WebSocket read error: {}", e));
                        }
                        None => {
                            return Err(anyhow::anyhow!("WebSocket stream ended"));
                        }
                    }
                }
                _ = shutdown.changed() => {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_never_grows() {
        let mut b = ReconnectBackoff::fixed(Duration::from_secs(3));
        for _ in 0..5 {
            assert_eq!(b.next_delay(), Duration::from_secs(3));
        }
    }

    #[test]
    fn exponential_backoff_caps_and_resets() {
        let mut b = ReconnectBackoff::new(Duration::from_secs(1), Duration::from_secs(4), 2.0);
        assert_eq!(b.next_delay(), Duration::from_secs(1));
        assert_eq!(b.next_delay(), Duration::from_secs(2));
        assert_eq!(b.next_delay(), Duration::from_secs(4));
        assert_eq!(b.next_delay(), Duration::from_secs(4));
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn stream_url_is_lowercase_trade_stream() {
        let c = BinanceWsClient::new(
            "wss://stream.binance.com:9443/ws/",
            "PAXGUSDT",
            ReconnectBackoff::fixed(Duration::from_secs(3)),
        );
        assert_eq!(c.url(), "wss://stream.binance.com:9443/ws/paxgusdt@trade");
    }
}
