use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use telemetry_gate::kernel::stats::{InMemoryStatsStore, StatsStore};
use telemetry_gate::kernel::telemetry::{ids, ChannelSink};
use telemetry_gate::kernel::time::SystemClock;
use telemetry_gate::{Event, GamePlayStats, Metric, MetricRegistry, Position, TelemetryConfig, TelemetrySystem};
use tracing_subscriber::EnvFilter;

const TICK_MS: u64 = 50;
const SESSION_TICKS: u64 = 240;
const PLAYER_SPAWN_TICK: u64 = 10;

/// Host environment facts.
struct SystemContextMetric;

impl Metric for SystemContextMetric {
    fn identifier(&self) -> &str {
        ids::SYSTEM_CONTEXT
    }
    fn category(&self) -> &str {
        "system"
    }
    fn field_names(&self) -> Vec<String> {
        vec!["os".to_string(), "arch".to_string(), "cpus".to_string()]
    }
    fn snapshot(&self) -> Event {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Event::new(ids::SYSTEM_CONTEXT)
            .with_field("os", std::env::consts::OS)
            .with_field("arch", std::env::consts::ARCH)
            .with_field("cpus", cpus)
    }
}

/// Mirrors the player's persisted aggregate, picked up on refresh.
struct GamePlayMetric {
    source: InMemoryStatsStore,
    cached: GamePlayStats,
}

impl Metric for GamePlayMetric {
    fn identifier(&self) -> &str {
        ids::GAME_PLAY
    }
    fn category(&self) -> &str {
        "game_play"
    }
    fn field_names(&self) -> Vec<String> {
        vec!["distance_traveled".to_string(), "play_time_minutes".to_string()]
    }
    fn snapshot(&self) -> Event {
        Event::new(ids::GAME_PLAY)
            .with_field("distance_traveled", self.cached.distance_traveled)
            .with_field("play_time_minutes", self.cached.play_time_minutes)
    }
    fn refresh(&mut self) {
        if let Ok(Some(stats)) = self.source.load() {
            self.cached = stats;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Usage: telemetry-gate [--opt-in] [config.json]
    let mut opt_in = false;
    let mut config_path = PathBuf::from("telemetry.json");
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--opt-in" => opt_in = true,
            other => config_path = PathBuf::from(other),
        }
    }

    // A missing file means the user never decided: telemetry stays off.
    let mut config = TelemetryConfig::load(&config_path)?;
    if opt_in {
        tracing::info!("Telemetry enabled from the command line");
        config.telemetry_enabled = true;
    } else if !config.telemetry_enabled {
        tracing::info!("Telemetry disabled; pass --opt-in to enable it");
    }

    let (sink, mut rx) = ChannelSink::channel(256);
    let consumer = tokio::spawn(async move {
        while let Some(sent) = rx.recv().await {
            match serde_json::to_string(&sent) {
                Ok(json) => println!("[SINK] {}", json),
                Err(e) => tracing::warn!("Unprintable event: {}", e),
            }
        }
    });

    let stats_store = InMemoryStatsStore::new();
    let mut registry = MetricRegistry::new();
    registry.register(Box::new(SystemContextMetric));
    registry.register(Box::new(GamePlayMetric {
        source: stats_store.clone(),
        cached: GamePlayStats::default(),
    }));

    let mut system = TelemetrySystem::new(
        config,
        registry,
        Arc::new(sink),
        Box::new(stats_store),
        Arc::new(SystemClock),
    );

    system.initialise();
    system.start();

    let mut cadence = tokio::time::interval(Duration::from_millis(TICK_MS));
    cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let delta = TICK_MS as f32 / 1000.0;
    for frame in 0..SESSION_TICKS {
        cadence.tick().await;
        // Player spawns after a short loading phase, then walks in a circle.
        let player = (frame >= PLAYER_SPAWN_TICK).then(|| {
            let angle = frame as f32 * 0.05;
            Position::new(10.0 * angle.cos(), 0.0, 10.0 * angle.sin())
        });
        system.tick(delta, player);
    }

    system.shutdown();
    if let Some(stats) = system.stats() {
        tracing::info!(
            distance = stats.distance_traveled,
            minutes = stats.play_time_minutes,
            "Session totals"
        );
    }
    system.sync_config().save(&config_path)?;

    // Dropping the system drops the sink sender and lets the consumer finish.
    drop(system);
    consumer.await?;
    Ok(())
}
