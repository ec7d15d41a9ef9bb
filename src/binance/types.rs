use serde::Deserialize;

use crate::error::AppError;
use crate::model::tick::Tick;

/// Deserialize Binance string-encoded numbers to f64.
pub fn string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<f64>().map_err(serde::de::Error::custom)
}

/// Binance trade stream event (symbol@trade).
#[derive(Debug, Deserialize)]
pub struct BinanceTradeEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub trade_id: u64,
    #[serde(rename = "p", deserialize_with = "string_to_f64")]
    pub price: f64,
    #[serde(rename = "q", deserialize_with = "string_to_f64")]
    pub qty: f64,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

impl BinanceTradeEvent {
    pub fn into_tick(self) -> Result<Tick, AppError> {
        Ok(Tick::new(&self.symbol, self.price, self.event_time)?
            .with_taker_side(!self.is_buyer_maker))
    }
}

/// GET /api/v3/ticker/price?symbol=...
#[derive(Debug, Deserialize)]
pub struct BinanceTickerPrice {
    pub symbol: String,
    #[serde(deserialize_with = "string_to_f64")]
    pub price: f64,
}

impl BinanceTickerPrice {
    pub fn into_tick(self, timestamp_ms: u64) -> Result<Tick, AppError> {
        Tick::new(&self.symbol, self.price, timestamp_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct BinanceApiErrorResponse {
    pub code: i64,
    pub msg: String,
}
