use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use url::Url;

use crate::error::AppError;
use crate::event::AppEvent;

use super::types::{BinanceApiErrorResponse, BinanceTickerPrice};

/// Public-endpoint REST client. No keys: only market data is read.
pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceRestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn ticker_price_url(&self, symbol: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/api/v3/ticker/price", self.base_url))
            .with_context(|| format!("invalid rest base url {}", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("symbol", &symbol.trim().to_ascii_uppercase());
        Ok(url)
    }

    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/api/v3/ping", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .context("ping failed")?
            .error_for_status()
            .context("ping returned error status")?;
        Ok(())
    }

    pub async fn ticker_price(&self, symbol: &str) -> Result<BinanceTickerPrice> {
        let url = self.ticker_price_url(symbol)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("ticker_price HTTP failed")?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<BinanceApiErrorResponse>(&body) {
                return Err(AppError::BinanceApi {
                    code: err.code,
                    msg: err.msg,
                }
                .into());
            }
            return Err(anyhow::anyhow!("Ticker request failed: {}", body));
        }

        let body = resp.text().await.context("ticker_price body read failed")?;
        let ticker: BinanceTickerPrice =
            serde_json::from_str(&body).map_err(AppError::from)?;
        Ok(ticker)
    }

    /// Pull the ticker price every `interval` until shutdown. A failed pull is
    /// reported and retried on the next interval.
    pub async fn poll_and_run(
        &self,
        symbol: &str,
        interval: Duration,
        app_tx: mpsc::Sender<AppEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(symbol, interval_ms = interval.as_millis() as u64, "Polling ticker price");
        let mut dropped: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => return Ok(()),
            }

            let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
            let tick = self
                .ticker_price(symbol)
                .await
                .and_then(|t| t.into_tick(now_ms).map_err(anyhow::Error::from));
            match tick {
                Ok(tick) => {
                    if app_tx.try_send(AppEvent::MarketTick(tick)).is_err() {
                        dropped += 1;
                        tracing::warn!(dropped, "Event channel full, dropping tick");
                    }
                }
                Err(e) => {
                    tracing::warn!(symbol, error = %e, "Ticker poll failed");
                    let _ = app_tx
                        .send(AppEvent::Error(format!("Feed error: {:#}", e)))
                        .await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_url_carries_uppercase_symbol() {
        let client = BinanceRestClient::new("https://api.binance.com/");
        let url = client.ticker_price_url("paxgusdt").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.binance.com/api/v3/ticker/price?symbol=PAXGUSDT"
        );
    }
}
