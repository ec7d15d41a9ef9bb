use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use crate::error::AppError;
use crate::event::AppEvent;
use crate::model::tick::Tick;

/// Which transport delivers ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Binance `symbol@trade` WebSocket stream.
    #[default]
    Ws,
    /// Fixed-interval pull of the REST ticker price.
    Poll,
    /// Line-delimited prices read from a file.
    Replay,
}

fn json_price(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Decode one payload line into a tick.
///
/// Accepts a bare number (`4551.68`) or a JSON object carrying `price` or
/// `p`, as a string or a number. A boolean `m` (buyer is maker) sets the
/// taker side.
pub fn decode_tick(symbol: &str, line: &str, timestamp_ms: u64) -> Result<Tick, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(AppError::InvalidTick("empty payload".to_string()));
    }

    if !line.starts_with('{') {
        let price = line
            .parse::<f64>()
            .map_err(|e| AppError::InvalidTick(format!("'{}': {}", line, e)))?;
        return Tick::new(symbol, price, timestamp_ms);
    }

    let value: serde_json::Value = serde_json::from_str(line)?;
    let price = value
        .get("price")
        .or_else(|| value.get("p"))
        .and_then(json_price)
        .ok_or_else(|| AppError::InvalidTick(format!("no numeric price in {}", line)))?;
    let tick = Tick::new(symbol, price, timestamp_ms)?;
    Ok(match value.get("m").and_then(|m| m.as_bool()) {
        Some(buyer_is_maker) => tick.with_taker_side(!buyer_is_maker),
        None => tick,
    })
}

/// Convenience wrapper returning only the price.
pub fn decode_price_line(line: &str) -> Result<f64, AppError> {
    decode_tick("", line, 0).map(|t| t.price)
}

/// Replays a line-delimited price file into the tick channel.
pub struct ReplaySource {
    path: PathBuf,
    symbol: String,
    pace: Option<Duration>,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>, symbol: &str) -> Self {
        Self {
            path: path.into(),
            symbol: symbol.to_string(),
            pace: None,
        }
    }

    /// Sleep between lines instead of replaying as fast as possible.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    /// Stream the file. Blank and `#` lines are skipped; malformed lines are
    /// reported and skipped. Returns the number of ticks sent.
    pub async fn run(
        &self,
        app_tx: mpsc::Sender<AppEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<usize> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("failed to open replay file {}", self.path.display()))?;
        let mut lines = BufReader::new(file).lines();
        let mut sent = 0usize;
        let mut line_no = 0u64;

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("replay read failed")?,
                _ = shutdown.changed() => {
                    tracing::info!(sent, "Replay interrupted by shutdown");
                    return Ok(sent);
                }
            };
            let Some(line) = line else {
                break;
            };
            line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match decode_tick(&self.symbol, trimmed, line_no) {
                Ok(tick) => {
                    if app_tx.send(AppEvent::MarketTick(tick)).await.is_err() {
                        tracing::info!("Event channel closed, replay stopping");
                        return Ok(sent);
                    }
                    sent += 1;
                }
                Err(e) => {
                    tracing::debug!(line = line_no, error = %e, "Skipping malformed replay line");
                    let _ = app_tx
                        .send(AppEvent::TickRejected {
                            reason: format!("line {}: {}", line_no, e),
                        })
                        .await;
                }
            }
            if let Some(pace) = self.pace {
                tokio::time::sleep(pace).await;
            }
        }

        tracing::info!(sent, path = %self.path.display(), "Replay finished");
        let _ = app_tx.send(AppEvent::FeedExhausted).await;
        Ok(sent)
    }
}
