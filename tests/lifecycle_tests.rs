mod common;

use common::{harness, harness_with_store, sent_schemas, FixedMetric};
use std::time::Duration;
use telemetry_gate::kernel::stats::InMemoryStatsStore;
use telemetry_gate::kernel::telemetry::ids;
use telemetry_gate::{GamePlayStats, Lifecycle, Position, TelemetryConfig};

const DT: f32 = 0.016;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-4
}

#[test]
fn test_first_valid_frame_sets_baseline_only() {
    let mut h = harness(TelemetryConfig::enabled(), vec![]);
    h.system.initialise();
    h.system.start();

    h.system.tick(DT, Some(Position::new(0.0, 0.0, 0.0)));
    let stats = h.system.stats().expect("Stats attached on first valid frame");
    assert_eq!(stats.distance_traveled, 0.0);
    assert_eq!(stats.play_time_minutes, 0.0);

    h.clock.advance(Duration::from_secs(10));
    h.system.tick(DT, Some(Position::new(3.0, 4.0, 0.0)));

    let stats = h.system.stats().unwrap();
    assert!(approx(stats.distance_traveled, 5.0), "distance {}", stats.distance_traveled);
    assert!(approx(stats.play_time_minutes, 10.0 / 60.0), "minutes {}", stats.play_time_minutes);

    // Persisted after mutation
    assert_eq!(h.store.current(), Some(stats));
}

#[test]
fn test_distance_is_sum_of_steps_and_never_decreases() {
    let mut h = harness(TelemetryConfig::default(), vec![]);
    h.system.initialise();
    h.system.start();

    let path = [
        Position::new(100.0, 0.0, 0.0), // baseline, not counted
        Position::new(100.0, 2.0, 0.0),
        Position::new(100.0, 2.0, 0.0),
        Position::new(103.0, 6.0, 0.0),
        Position::new(103.0, 6.0, 1.0),
    ];

    let mut last = 0.0;
    for pos in path {
        h.clock.advance(Duration::from_millis(500));
        h.system.tick(DT, Some(pos));
        let now = h.system.stats().unwrap().distance_traveled;
        assert!(now >= last);
        last = now;
    }
    assert!(approx(last, 2.0 + 0.0 + 5.0 + 1.0), "distance {}", last);
}

#[test]
fn test_play_time_counts_wall_time_since_start() {
    let mut h = harness(TelemetryConfig::default(), vec![]);
    h.system.initialise();
    h.system.start();

    // Loading screen: player not valid yet.
    for _ in 0..3 {
        h.clock.advance(Duration::from_secs(1));
        h.system.tick(DT, None);
    }
    assert!(h.system.stats().is_none());

    h.system.tick(DT, Some(Position::default()));
    for _ in 0..6 {
        h.clock.advance(Duration::from_secs(10));
        // Standing still still accrues time.
        h.system.tick(DT, Some(Position::default()));
    }

    let stats = h.system.stats().unwrap();
    assert_eq!(stats.distance_traveled, 0.0);
    assert!(approx(stats.play_time_minutes, 63.0 / 60.0), "minutes {}", stats.play_time_minutes);
}

#[test]
fn test_existing_aggregate_is_resumed() {
    let store = InMemoryStatsStore::with_stats(GamePlayStats {
        distance_traveled: 100.0,
        play_time_minutes: 30.0,
    });
    let mut h = harness_with_store(TelemetryConfig::default(), vec![], store);
    h.system.initialise();
    h.system.start();

    h.system.tick(DT, Some(Position::new(0.0, 0.0, 0.0)));
    h.clock.advance(Duration::from_secs(60));
    h.system.tick(DT, Some(Position::new(0.0, 0.0, 5.0)));

    let stats = h.system.stats().unwrap();
    assert!(approx(stats.distance_traveled, 105.0));
    assert!(approx(stats.play_time_minutes, 31.0));
}

#[test]
fn test_refresh_at_most_once_per_window() {
    let mut h = harness(TelemetryConfig::default(), vec![]);
    h.system.initialise();
    h.system.start();

    // Exactly at the threshold is not "exceeded".
    for _ in 0..5 {
        h.clock.advance(Duration::from_secs(1));
        h.system.tick(DT, None);
    }
    assert_eq!(h.system.refresh_count(), 0);

    h.clock.advance(Duration::from_millis(500));
    h.system.tick(DT, None);
    assert_eq!(h.system.refresh_count(), 1);

    // Burst inside the next window.
    for _ in 0..100 {
        h.clock.advance(Duration::from_millis(40));
        h.system.tick(DT, Some(Position::default()));
    }
    assert_eq!(h.system.refresh_count(), 1);

    h.clock.advance(Duration::from_secs(2));
    h.system.tick(DT, None);
    assert_eq!(h.system.refresh_count(), 2);
}

#[test]
fn test_refresh_recomputes_metrics() {
    let config = TelemetryConfig::enabled();
    let metric = FixedMetric::boxed(ids::GAME_PLAY, "game_play", &[("kills", 0)]);
    let mut h = harness(config, vec![metric]);
    h.system.initialise();
    h.system.start();

    h.clock.advance(Duration::from_secs(6));
    h.system.tick(DT, None);
    h.clock.advance(Duration::from_secs(6));
    h.system.tick(DT, None);
    h.system.shutdown();

    let sent = h.sink.events();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event.get("kills"), Some(&serde_json::json!(2)));
}

#[test]
fn test_start_sends_bootstrap_metrics_when_enabled() {
    let metrics = vec![
        FixedMetric::boxed(ids::MODULES, "modules", &[("count", 3)]),
        FixedMetric::boxed(ids::SYSTEM_CONTEXT, "system", &[("cpus", 8)]),
        FixedMetric::boxed(ids::GAME_PLAY, "game_play", &[("kills", 1)]),
    ];
    let mut h = harness(TelemetryConfig::enabled(), metrics);
    h.system.initialise();
    h.system.start();

    assert_eq!(sent_schemas(&h.sink), vec![ids::MODULES, ids::SYSTEM_CONTEXT]);

    // Periodic refresh never dispatches.
    for _ in 0..5 {
        h.clock.advance(Duration::from_secs(6));
        h.system.tick(DT, None);
    }
    assert_eq!(h.sink.len(), 2);
}

#[test]
fn test_start_sends_nothing_when_disabled() {
    let metrics = vec![FixedMetric::boxed(ids::MODULES, "modules", &[("count", 3)])];
    let mut h = harness(TelemetryConfig::default(), metrics);
    h.system.initialise();
    h.system.start();
    assert!(h.sink.is_empty());
}

#[test]
fn test_shutdown_sends_terminal_metrics_skipping_absent() {
    let metrics = vec![
        FixedMetric::boxed(ids::MONSTER_KILLED, "combat", &[("monsters", 4)]),
        FixedMetric::boxed(ids::BLOCK_PLACED, "blocks", &[("placed", 9)]),
        FixedMetric::boxed("unrelated", "other", &[("x", 1)]),
    ];
    let mut h = harness(TelemetryConfig::enabled(), metrics);
    h.system.initialise();
    h.system.start();
    h.system.shutdown();

    // Terminal order, absent ones skipped, unrelated metric never sent.
    assert_eq!(sent_schemas(&h.sink), vec![ids::BLOCK_PLACED, ids::MONSTER_KILLED]);
    assert_eq!(h.system.lifecycle(), Lifecycle::Terminal);
}

#[test]
fn test_shutdown_disabled_makes_no_sink_calls() {
    let metrics = vec![
        FixedMetric::boxed(ids::MODULES, "modules", &[("count", 3)]),
        FixedMetric::boxed(ids::BLOCK_PLACED, "blocks", &[("placed", 9)]),
    ];
    let mut h = harness(TelemetryConfig::default(), metrics);
    h.system.initialise();
    h.system.start();
    for _ in 0..3 {
        h.clock.advance(Duration::from_secs(6));
        h.system.tick(DT, Some(Position::default()));
    }
    h.system.shutdown();
    assert!(h.sink.is_empty());
}

#[test]
fn test_custom_lifecycle_metrics() {
    let metrics = vec![
        FixedMetric::boxed("hello", "session", &[("n", 1)]),
        FixedMetric::boxed("bye", "session", &[("n", 2)]),
    ];
    let mut h = harness(TelemetryConfig::enabled(), metrics);
    h.system = h.system.with_lifecycle_metrics(["hello"], ["bye", "missing"]);
    h.system.initialise();
    h.system.start();
    h.system.shutdown();
    assert_eq!(sent_schemas(&h.sink), vec!["hello", "bye"]);
}

#[test]
fn test_out_of_order_calls_are_ignored() {
    let metrics = vec![FixedMetric::boxed(ids::MODULES, "modules", &[("count", 3)])];
    let mut h = harness(TelemetryConfig::enabled(), metrics);

    // Nothing happens before initialise/start.
    h.system.start();
    h.system.tick(DT, Some(Position::default()));
    assert_eq!(h.system.lifecycle(), Lifecycle::Uninitialized);
    assert_eq!(h.system.current_tick().frame, 0);
    assert!(h.sink.is_empty());

    h.system.initialise();
    h.system.initialise();
    assert_eq!(h.system.lifecycle(), Lifecycle::Ready);

    h.system.start();
    h.system.start();
    assert_eq!(h.sink.len(), 1, "Bootstrap sent exactly once");
    assert_eq!(h.system.lifecycle(), Lifecycle::Running);

    h.system.tick(DT, None);
    assert_eq!(h.system.current_tick().frame, 1);

    h.system.shutdown();
    h.system.shutdown();
    h.system.tick(DT, None);
    assert_eq!(h.system.lifecycle(), Lifecycle::Terminal);
    assert_eq!(h.system.current_tick().frame, 1);
}

#[test]
fn test_large_resumed_totals_keep_growing() {
    let store = InMemoryStatsStore::with_stats(GamePlayStats {
        distance_traveled: 5_000_000.0,
        play_time_minutes: 10_000.0,
    });
    let mut h = harness_with_store(TelemetryConfig::default(), vec![], store);
    h.system.initialise();
    h.system.start();

    // 3750 frames of 16 ms = 60 s, moving 0.01 per frame.
    h.system.tick(DT, Some(Position::new(0.0, 0.0, 0.0)));
    for i in 1..=3750 {
        h.clock.advance(Duration::from_millis(16));
        h.system.tick(DT, Some(Position::new(0.0, 0.0, i as f32 * 0.01)));
    }

    let stats = h.system.stats().unwrap();
    assert!((stats.play_time_minutes - 10_001.0).abs() < 1e-6, "minutes {}", stats.play_time_minutes);
    assert!((stats.distance_traveled - 5_000_037.5).abs() < 0.05, "distance {}", stats.distance_traveled);
}

#[test]
fn test_player_lost_and_regained_mid_session() {
    let mut h = harness(TelemetryConfig::default(), vec![]);
    h.system.initialise();
    h.system.start();

    h.system.tick(DT, Some(Position::new(0.0, 0.0, 0.0)));
    h.clock.advance(Duration::from_secs(6));
    h.system.tick(DT, Some(Position::new(0.0, 3.0, 0.0)));
    let before = h.system.stats().unwrap();
    assert!(approx(before.distance_traveled, 3.0));
    assert!(approx(before.play_time_minutes, 0.1));

    // Player unloaded for 30 s: nothing accrues while invalid.
    for _ in 0..30 {
        h.clock.advance(Duration::from_secs(1));
        h.system.tick(DT, None);
    }
    assert_eq!(h.system.stats(), Some(before));

    // Respawn elsewhere. The last valid position stays the baseline, and the
    // play-time sample spans the gap.
    h.clock.advance(Duration::from_secs(6));
    h.system.tick(DT, Some(Position::new(0.0, 3.0, 4.0)));

    let after = h.system.stats().unwrap();
    assert!(approx(after.distance_traveled, 7.0), "distance {}", after.distance_traveled);
    assert!(approx(after.play_time_minutes, 42.0 / 60.0), "minutes {}", after.play_time_minutes);
    assert_eq!(h.store.current(), Some(after));
}

#[test]
fn test_shutdown_from_ready_sends_terminal_metrics() {
    let metrics = vec![
        FixedMetric::boxed(ids::MODULES, "modules", &[("count", 3)]),
        FixedMetric::boxed(ids::GAME_PLAY, "game_play", &[("kills", 1)]),
    ];
    let mut h = harness(TelemetryConfig::enabled(), metrics);
    h.system.initialise();
    // Session never started: no bootstrap, but terminal metrics still go out.
    h.system.shutdown();

    assert_eq!(sent_schemas(&h.sink), vec![ids::GAME_PLAY]);
    assert_eq!(h.system.lifecycle(), Lifecycle::Terminal);
}

#[test]
fn test_shutdown_before_initialise_is_ignored() {
    let metrics = vec![FixedMetric::boxed(ids::GAME_PLAY, "game_play", &[("kills", 1)])];
    let mut h = harness(TelemetryConfig::enabled(), metrics);
    h.system.shutdown();

    assert!(h.sink.is_empty());
    assert_eq!(h.system.lifecycle(), Lifecycle::Uninitialized);
}
