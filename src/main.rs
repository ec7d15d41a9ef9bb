use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use sentinel::binance::rest::BinanceRestClient;
use sentinel::binance::ws::{BinanceWsClient, ReconnectBackoff};
use sentinel::config::Config;
use sentinel::engine::{MetricsSnapshot, StreamingStatsEngine};
use sentinel::event::AppEvent;
use sentinel::feed::{FeedMode, ReplaySource};
use sentinel::session::FeedSession;

fn init_tracing(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .logging
            .level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });

    match &config.logging.file {
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(log_file)
                .with_ansi(false)
                .json()
                .init();
        }
        None => {
            // stdout carries snapshots, keep logs on stderr
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn spawn_feed(
    config: &Config,
    app_tx: mpsc::Sender<AppEvent>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let symbol = config.feed.normalized_symbol();
    match config.feed.mode {
        FeedMode::Ws => {
            let backoff = ReconnectBackoff::new(
                Duration::from_millis(config.feed.reconnect_delay_ms),
                Duration::from_millis(config.feed.reconnect_max_delay_ms),
                2.0,
            );
            let client = BinanceWsClient::new(&config.feed.ws_base_url, &symbol, backoff);
            tokio::spawn(async move {
                if let Err(e) = client.connect_and_run(app_tx.clone(), shutdown_rx).await {
                    tracing::warn!(symbol = %symbol, error = %e, "WS worker failed");
                    let _ = app_tx
                        .send(AppEvent::Error(format!("WS worker failed: {:#}", e)))
                        .await;
                }
            });
        }
        FeedMode::Poll => {
            let interval = config.feed.poll_interval()?;
            let client = BinanceRestClient::new(&config.feed.rest_base_url);
            tokio::spawn(async move {
                match client.ping().await {
                    Ok(()) => tracing::info!("Binance ping OK"),
                    Err(e) => tracing::warn!(error = %e, "Binance ping failed, polling anyway"),
                }
                if let Err(e) = client
                    .poll_and_run(&symbol, interval, app_tx.clone(), shutdown_rx)
                    .await
                {
                    tracing::warn!(symbol = %symbol, error = %e, "Poll worker failed");
                    let _ = app_tx
                        .send(AppEvent::Error(format!("Poll worker failed: {:#}", e)))
                        .await;
                }
            });
        }
        FeedMode::Replay => {
            let path = config
                .feed
                .replay_path
                .clone()
                .context("feed.replay_path is required for replay mode")?;
            let mut source = ReplaySource::new(path, &symbol);
            if config.feed.replay_pace_ms > 0 {
                source = source.with_pace(Duration::from_millis(config.feed.replay_pace_ms));
            }
            tokio::spawn(async move {
                if let Err(e) = source.run(app_tx.clone(), shutdown_rx).await {
                    tracing::warn!(error = %e, "Replay worker failed");
                    let _ = app_tx
                        .send(AppEvent::Error(format!("Replay failed: {:#}", e)))
                        .await;
                }
            });
        }
    }
    Ok(())
}

fn emit_snapshot(out: &mut impl Write, snapshot: &MetricsSnapshot) -> Result<()> {
    let line = serde_json::to_string(snapshot).context("snapshot serialization failed")?;
    writeln!(out, "{}", line).context("failed to write snapshot")?;
    out.flush().context("failed to flush snapshot")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set SENTINEL_CONFIG or create config/default.toml");
            std::process::exit(1);
        }
    };
    init_tracing(&config)?;

    let symbol = config.feed.normalized_symbol();
    tracing::info!(
        symbol = %symbol,
        mode = ?config.feed.mode,
        rest_url = %config.feed.rest_base_url,
        ws_url = %config.feed.ws_base_url,
        "Starting sentinel"
    );

    let engine = StreamingStatsEngine::new(config.engine.clone()).context("invalid engine config")?;
    let mut session = FeedSession::new(&symbol, engine);

    // Ticks and status share one channel so a reconnect reset is applied
    // before any tick of the new connection.
    let (app_tx, mut app_rx) = mpsc::channel::<AppEvent>(256);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut shutdown_watch = shutdown_rx.clone();
    spawn_feed(&config, app_tx, shutdown_rx)?;

    // Ctrl+C handler
    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received");
        let _ = ctrl_c_shutdown.send(true);
    });

    let mut stdout = std::io::stdout().lock();
    let mut last_regime = None;
    let mut rejected: u64 = 0;

    loop {
        let event = tokio::select! {
            event = app_rx.recv() => event,
            _ = shutdown_watch.changed() => break,
        };
        let Some(event) = event else {
            tracing::info!("Event channel closed");
            break;
        };

        if let Some(snapshot) = session.on_event(&event) {
            tracing::debug!(
                price = snapshot.price,
                volatility = snapshot.volatility,
                z = snapshot.z_score,
                oscillator = snapshot.oscillator,
                regime = %snapshot.regime,
                "Tick ingested"
            );
            if last_regime != Some(snapshot.regime) {
                if snapshot.regime.is_stressed() {
                    tracing::warn!(
                        symbol = %symbol,
                        regime = %snapshot.regime,
                        volatility = snapshot.volatility,
                        z = snapshot.z_score,
                        "High-risk regime"
                    );
                } else {
                    tracing::info!(symbol = %symbol, regime = %snapshot.regime, "Regime changed");
                }
                last_regime = Some(snapshot.regime);
            }
            if let Some(bucket) = snapshot.bucket {
                tracing::info!(
                    symbol = %symbol,
                    close = bucket.close,
                    high = bucket.high,
                    low = bucket.low,
                    oscillator = bucket.oscillator,
                    volatility = snapshot.volatility,
                    regime = %snapshot.regime,
                    up = snapshot.up_ticks,
                    down = snapshot.down_ticks,
                    stealth_buy = snapshot.stealth_buy,
                    stealth_sell = snapshot.stealth_sell,
                    aggressor_buys = snapshot.aggressor_buys,
                    aggressor_sells = snapshot.aggressor_sells,
                    buy_pressure_pct = snapshot.buy_pressure_pct(),
                    stealth_buy_pct = snapshot.stealth_buy_pct(),
                    "Bucket closed"
                );
            }
            if config.output.json_lines {
                emit_snapshot(&mut stdout, &snapshot)?;
            }
            continue;
        }

        match event {
            AppEvent::WsStatus(status) => tracing::info!(status = ?status, "Feed status"),
            AppEvent::TickRejected { reason } => {
                rejected += 1;
                tracing::debug!(rejected, reason = %reason, "Tick rejected");
            }
            AppEvent::FeedExhausted => {
                tracing::info!("Feed exhausted");
                break;
            }
            AppEvent::LogMessage(msg) => tracing::info!("{}", msg),
            AppEvent::Error(msg) => tracing::error!("{}", msg),
            AppEvent::MarketTick(_) => {}
        }
    }

    let _ = shutdown_tx.send(true);
    if let Some(last) = session.last_snapshot() {
        tracing::info!(
            ticks = last.tick_count,
            regime = %last.regime,
            resets = session.resets(),
            buckets = session.price_history().len(),
            rejected,
            "Shutdown complete"
        );
    } else {
        tracing::info!(rejected, "Shutdown complete, no ticks received");
    }
    Ok(())
}
