use sentinel::engine::{EngineConfig, Regime, StreamingStatsEngine};
use sentinel::event::{AppEvent, WsConnectionStatus};
use sentinel::model::tick::Tick;
use sentinel::session::FeedSession;

fn session() -> FeedSession {
    let engine = StreamingStatsEngine::new(EngineConfig {
        bucket_size: 2,
        ..EngineConfig::default()
    })
    .unwrap();
    FeedSession::new("PAXGUSDT", engine)
}

fn feed(session: &mut FeedSession, prices: &[f64]) {
    for p in prices {
        session.on_tick(&Tick::from_price(*p));
    }
}

#[test]
fn reset_discards_all_counters_and_variance() {
    let mut s = session();
    feed(&mut s, &[100.0, 101.0, 101.0, 99.0, 103.0, 103.0, 98.0]);
    let before = s.last_snapshot().unwrap().clone();
    assert!(before.up_ticks > 0 && before.down_ticks > 0);
    assert!(before.stealth_buy + before.stealth_sell > 0);
    assert!(!s.price_history().is_empty());

    s.reset();
    assert!(s.last_snapshot().is_none());
    let state = s.state();
    assert_eq!(state.last_price(), None);
    assert!((state.variance() - 0.0001).abs() < f64::EPSILON);
    assert_eq!(state.tick_counters().up, 0);
    assert_eq!(state.tick_counters().down, 0);
    assert_eq!(state.stealth_counters().buy, 0);
    assert_eq!(state.stealth_counters().sell, 0);
    assert!(s.price_history().is_empty());
    assert!(s.oscillator_history().is_empty());

    // The first post-reset tick only seeds; nothing from the old session leaks.
    let snap = s.on_tick(&Tick::from_price(250.0));
    assert_eq!(snap.up_ticks + snap.down_ticks, 0);
    assert_eq!(snap.stealth_buy + snap.stealth_sell, 0);
    assert_eq!(snap.tick_count, 1);
    assert_eq!(snap.regime, Regime::Init);
    let snap = s.on_tick(&Tick::from_price(251.0));
    assert_eq!(snap.up_ticks, 1);
    assert_eq!(snap.down_ticks, 0);
}

#[test]
fn reconnect_resets_but_first_connect_does_not() {
    let mut s = session();
    s.on_status(&WsConnectionStatus::Connected);
    feed(&mut s, &[10.0, 11.0, 12.0]);
    assert_eq!(s.resets(), 0);
    assert_eq!(s.last_snapshot().unwrap().up_ticks, 2);

    s.on_status(&WsConnectionStatus::Disconnected);
    s.on_status(&WsConnectionStatus::Reconnecting {
        attempt: 1,
        delay_ms: 3000,
    });
    // State survives until the new connection is live.
    assert_eq!(s.state().tick_counters().up, 2);

    s.on_status(&WsConnectionStatus::Connected);
    assert_eq!(s.resets(), 1);
    assert_eq!(s.state().tick_counters().up, 0);
    assert_eq!(s.state().last_price(), None);

    s.on_status(&WsConnectionStatus::Connected);
    assert_eq!(s.resets(), 1);
}

#[test]
fn histories_exposed_through_session() {
    let mut s = session();
    feed(&mut s, &[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(s.price_history(), vec![3.0, 5.0]);
    assert_eq!(s.oscillator_history(), vec![100.0, 100.0]);
    assert_eq!(s.history_capacity(), 30);
    assert_eq!(s.symbol(), "PAXGUSDT");
}

fn tick_event(price: f64) -> AppEvent {
    AppEvent::MarketTick(Tick::from_price(price))
}

#[test]
fn interleaved_events_apply_in_arrival_order() {
    let mut s = session();
    let events = vec![
        AppEvent::WsStatus(WsConnectionStatus::Connected),
        tick_event(10.0),
        tick_event(11.0),
        tick_event(12.0),
        tick_event(11.0),
        AppEvent::WsStatus(WsConnectionStatus::Disconnected),
        AppEvent::LogMessage("WS error: stream ended".to_string()),
        AppEvent::WsStatus(WsConnectionStatus::Reconnecting {
            attempt: 1,
            delay_ms: 3000,
        }),
        AppEvent::WsStatus(WsConnectionStatus::Connected),
        tick_event(50.0),
        tick_event(49.0),
    ];

    let snapshots: Vec<_> = events.iter().filter_map(|e| s.on_event(e)).collect();
    assert_eq!(snapshots.len(), 6);
    assert_eq!(snapshots[3].up_ticks, 2);
    assert_eq!(snapshots[3].down_ticks, 1);

    // First tick of the new connection sees a fresh state.
    let first = &snapshots[4];
    assert_eq!(first.tick_count, 1);
    assert_eq!(first.regime, Regime::Init);
    assert_eq!(first.up_ticks + first.down_ticks, 0);
    assert_eq!(first.return_ratio, 0.0);

    // Its delta is measured against 50, not the old 11.
    let second = &snapshots[5];
    assert_eq!(second.tick_count, 2);
    assert_eq!(second.up_ticks, 0);
    assert_eq!(second.down_ticks, 1);
    assert!((second.return_ratio - (-1.0 / 50.0)).abs() < 1e-12);
    assert_eq!(s.resets(), 1);
}

#[test]
fn non_tick_events_produce_no_snapshot() {
    let mut s = session();
    assert!(s.on_event(&AppEvent::FeedExhausted).is_none());
    assert!(s
        .on_event(&AppEvent::TickRejected {
            reason: "bad".to_string()
        })
        .is_none());
    assert!(s.last_snapshot().is_none());
    assert_eq!(s.state().tick_count(), 0);
}
