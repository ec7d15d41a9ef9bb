use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::feed::FeedMode;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub mode: FeedMode,
    pub rest_base_url: String,
    pub ws_base_url: String,
    pub symbol: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default)]
    pub replay_path: Option<PathBuf>,
    /// Delay between replayed lines; 0 replays as fast as the engine consumes.
    #[serde(default)]
    pub replay_pace_ms: u64,
}

fn default_poll_interval() -> String {
    "5s".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Write every snapshot to stdout as one JSON object per line.
    #[serde(default)]
    pub json_lines: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// JSON log file; logs go to stderr when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Parse an interval string (e.g. "1s", "5s", "1m", "1h", "1d", "1w", "1M") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    let Some((idx, _)) = s.char_indices().last() else {
        bail!("invalid interval '{}': expected format like '5s'", s);
    };
    if idx == 0 {
        bail!("invalid interval '{}': expected format like '5s'", s);
    }

    let (num_str, suffix) = s.split_at(idx);
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        "M" => 30 * 86_400_000,
        _ => bail!(
            "invalid interval '{}': unsupported suffix '{}', expected one of s/m/h/d/w/M",
            s,
            suffix
        ),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Result<Duration> {
        parse_interval_ms(&self.poll_interval).map(Duration::from_millis)
    }

    pub fn normalized_symbol(&self) -> String {
        self.symbol.trim().to_ascii_uppercase()
    }
}

impl Config {
    /// Read `.env`, then the TOML file named by `SENTINEL_CONFIG`
    /// (default `config/default.toml`). `SENTINEL_SYMBOL` overrides the symbol.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("SENTINEL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::load_from_path(&config_path)?;

        if let Ok(symbol) = std::env::var("SENTINEL_SYMBOL") {
            if !symbol.trim().is_empty() {
                config.feed.symbol = symbol;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&config_str).with_context(|| format!("failed to load {}", path.display()))
    }

    /// Parse and validate a TOML document.
    pub fn parse(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed.normalized_symbol().is_empty() {
            bail!("feed.symbol must not be empty");
        }
        url::Url::parse(&self.feed.rest_base_url).context("feed.rest_base_url is invalid")?;
        let ws = url::Url::parse(&self.feed.ws_base_url).context("feed.ws_base_url is invalid")?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            bail!("feed.ws_base_url must use ws:// or wss://, got {}", ws.scheme());
        }
        self.feed
            .poll_interval()
            .context("feed.poll_interval is invalid")?;
        if self.feed.reconnect_delay_ms == 0 {
            bail!("feed.reconnect_delay_ms must be > 0");
        }
        if self.feed.mode == FeedMode::Replay && self.feed.replay_path.is_none() {
            bail!("feed.replay_path is required when feed.mode = \"replay\"");
        }
        self.engine.validate().context("engine section is invalid")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[feed]
rest_base_url = "https://api.binance.com"
ws_base_url = "wss://stream.binance.com:9443/ws"
symbol = "PAXGUSDT"
"#;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.feed.mode, FeedMode::Ws);
        assert_eq!(config.feed.poll_interval().unwrap(), Duration::from_secs(5));
        assert_eq!(config.feed.reconnect_delay_ms, 3_000);
        assert_eq!(config.engine.bucket_size, 12);
        assert_eq!(config.engine.oscillator_period, 14);
        assert!(!config.output.json_lines);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_interval_valid() {
        assert_eq!(parse_interval_ms("5s").unwrap(), 5_000);
        assert_eq!(parse_interval_ms("1m").unwrap(), 60_000);
        assert_eq!(parse_interval_ms("2h").unwrap(), 7_200_000);
    }

    #[test]
    fn parse_interval_rejects_invalid_inputs() {
        assert!(parse_interval_ms("").is_err());
        assert!(parse_interval_ms("s").is_err());
        assert!(parse_interval_ms("0s").is_err());
        assert!(parse_interval_ms("1x").is_err());
    }

    #[test]
    fn parse_interval_rejects_multibyte_suffix() {
        assert!(parse_interval_ms("5µ").is_err());
        assert!(parse_interval_ms("µ").is_err());
        assert!(parse_interval_ms("5秒").is_err());
    }
}
