use crate::error::AppError;

/// A single validated price observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub timestamp_ms: u64,
    /// Aggressor side when the transport reports it (trade stream only).
    pub taker_is_buyer: Option<bool>,
}

impl Tick {
    /// Build a tick, rejecting prices the engine cannot ingest.
    pub fn new(symbol: &str, price: f64, timestamp_ms: u64) -> Result<Self, AppError> {
        if !price.is_finite() {
            return Err(AppError::InvalidTick(format!(
                "{}: price {} is not finite",
                symbol, price
            )));
        }
        if price < 0.0 {
            return Err(AppError::InvalidTick(format!(
                "{}: price {} is negative",
                symbol, price
            )));
        }
        Ok(Self {
            symbol: symbol.to_string(),
            price,
            timestamp_ms,
            taker_is_buyer: None,
        })
    }

    pub fn with_taker_side(mut self, taker_is_buyer: bool) -> Self {
        self.taker_is_buyer = Some(taker_is_buyer);
        self
    }

    /// Create a synthetic tick from a bare price (replay files, tests).
    pub fn from_price(price: f64) -> Self {
        Self {
            symbol: "SYNTH".to_string(),
            price,
            timestamp_ms: 0,
            taker_is_buyer: None,
        }
    }
}
