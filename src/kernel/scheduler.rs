use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::config::TelemetryConfig;
use super::consent::ConsentStore;
use super::stats::{GamePlayStats, Position, StatsStore};
use super::telemetry::{ids, DispatchOutcome, Dispatcher, EventSink, Metric, MetricRegistry};
use super::time::{Clock, Tick};

/// Session lifecycle. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Running,
    ShuttingDown,
    Terminal,
}

/// Host-driven telemetry orchestrator.
///
/// Owns the consent map for the session, the refresh timer and the player's
/// running aggregates. Every mutation happens on the host's thread through
/// `initialise` / `start` / `tick` / `shutdown`; nothing here blocks or returns
/// an error to the host. Calls made in the wrong lifecycle state are ignored.
pub struct TelemetrySystem {
    config: TelemetryConfig,
    registry: MetricRegistry,
    consent: ConsentStore,
    dispatcher: Dispatcher,
    stats_store: Box<dyn StatsStore>,
    clock: Arc<dyn Clock>,

    lifecycle: Lifecycle,
    tick: Tick,
    stats: Option<GamePlayStats>,
    // Cleared when the stored aggregate exists but is unreadable.
    stats_writable: bool,
    previous_position: Option<Position>,
    last_refresh: Instant,
    last_play_sample: Instant,
    refresh_count: u64,

    bootstrap_metrics: Vec<String>,
    terminal_metrics: Vec<String>,
}

impl std::fmt::Debug for TelemetrySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetrySystem")
            .field("lifecycle", &self.lifecycle)
            .field("tick", &self.tick)
            .field("stats", &self.stats)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl TelemetrySystem {
    pub fn new(
        config: TelemetryConfig,
        registry: MetricRegistry,
        sink: Arc<dyn EventSink>,
        stats_store: Box<dyn StatsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        let dispatcher = Dispatcher::new(sink, config.namespace.clone());
        Self {
            config,
            registry,
            consent: ConsentStore::new(),
            dispatcher,
            stats_store,
            clock,
            lifecycle: Lifecycle::Uninitialized,
            tick: Tick::new(),
            stats: None,
            stats_writable: true,
            previous_position: None,
            last_refresh: now,
            last_play_sample: now,
            refresh_count: 0,
            bootstrap_metrics: ids::BOOTSTRAP.iter().map(|s| s.to_string()).collect(),
            terminal_metrics: ids::TERMINAL.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Overrides which metrics are sent at `start` and at `shutdown`.
    pub fn with_lifecycle_metrics<B, T>(mut self, bootstrap: B, terminal: T) -> Self
    where
        B: IntoIterator,
        B::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        self.bootstrap_metrics = bootstrap.into_iter().map(Into::into).collect();
        self.terminal_metrics = terminal.into_iter().map(Into::into).collect();
        self
    }

    // ---- lifecycle -------------------------------------------------------

    /// Uninitialized -> Ready. Loads persisted bindings and reconciles them
    /// against every registered metric.
    pub fn initialise(&mut self) {
        if !self.expect_state(Lifecycle::Uninitialized, "initialise") {
            return;
        }
        self.consent = ConsentStore::from_bindings(self.config.bindings.clone());
        self.reconcile_consent();
        self.last_refresh = self.clock.now();
        self.lifecycle = Lifecycle::Ready;
        info!(
            metrics = self.registry.len(),
            bindings = self.consent.len(),
            enabled = self.config.telemetry_enabled,
            "Telemetry initialised"
        );
    }

    /// Ready -> Running. Sends the bootstrap metrics if telemetry is enabled and
    /// starts the play-time clock.
    pub fn start(&mut self) {
        if !self.expect_state(Lifecycle::Ready, "start") {
            return;
        }
        if self.config.telemetry_enabled {
            for id in &self.bootstrap_metrics {
                self.dispatch_metric(id);
            }
        }
        self.last_play_sample = self.clock.now();
        self.lifecycle = Lifecycle::Running;
        info!("Telemetry running");
    }

    /// Per-frame update. `player` is `None` while the local player is not valid.
    /// The last valid position is kept across invalid frames, so a respawn counts
    /// the jump from where the player was last seen.
    pub fn tick(&mut self, delta_secs: f32, player: Option<Position>) {
        if self.lifecycle != Lifecycle::Running {
            trace!(state = ?self.lifecycle, "Tick ignored");
            return;
        }
        self.tick = self.tick.next();
        trace!(frame = self.tick.frame, delta_secs, "Telemetry tick");

        if let Some(position) = player {
            match self.previous_position {
                // First valid frame: no baseline yet, so no delta.
                None => {
                    self.attach_stats();
                    self.previous_position = Some(position);
                }
                Some(_) => {
                    self.record_distance(position);
                    self.record_play_time();
                }
            }
        }

        self.refresh_if_due();
    }

    /// Running (or Ready) -> ShuttingDown -> Terminal. Sends every terminal metric
    /// independently; absent ones are skipped.
    pub fn shutdown(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Running | Lifecycle::Ready) {
            warn!(state = ?self.lifecycle, "shutdown called out of order, ignoring");
            return;
        }
        self.lifecycle = Lifecycle::ShuttingDown;
        if self.config.telemetry_enabled {
            for id in &self.terminal_metrics {
                self.dispatch_metric(id);
            }
        }
        self.lifecycle = Lifecycle::Terminal;
        info!(frames = self.tick.frame, "Telemetry shut down");
    }

    // ---- host-facing controls -------------------------------------------

    /// Registers a metric, possibly mid-session. Its keys are picked up by the
    /// next reconciliation with whatever the global flag is at that moment.
    pub fn register_metric(&mut self, metric: Box<dyn Metric>) {
        self.registry.register(metric);
    }

    /// Changes the global flag. Existing consent keys are left untouched.
    pub fn set_telemetry_enabled(&mut self, enabled: bool) {
        self.config.telemetry_enabled = enabled;
    }

    /// Explicit user decision on a single key.
    pub fn set_consent(&mut self, key: impl Into<String>, allowed: bool) {
        self.consent.set(key, allowed);
    }

    /// Copies the session's bindings back into the config so the host can persist it.
    pub fn sync_config(&mut self) -> &TelemetryConfig {
        self.config.bindings = self.consent.bindings().clone();
        &self.config
    }

    // ---- accessors -------------------------------------------------------

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn stats(&self) -> Option<GamePlayStats> {
        self.stats
    }

    pub fn consent(&self) -> &ConsentStore {
        &self.consent
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// How many periodic refreshes have run.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    // ---- internals -------------------------------------------------------

    fn expect_state(&self, expected: Lifecycle, op: &str) -> bool {
        if self.lifecycle == expected {
            return true;
        }
        warn!(op, state = ?self.lifecycle, expected = ?expected, "Lifecycle call out of order, ignoring");
        false
    }

    /// Adds every category and field key not yet on record, defaulting to the
    /// current global flag. Never changes an existing key.
    fn reconcile_consent(&mut self) {
        let fallback = self.config.telemetry_enabled;
        let mut inserted = 0;
        for metric in self.registry.all() {
            if self.consent.ensure_default(metric.category(), fallback) {
                inserted += 1;
            }
            for field in metric.field_names() {
                if self.consent.ensure_default(&field, fallback) {
                    inserted += 1;
                }
            }
        }
        if inserted > 0 {
            info!(inserted, fallback, "Consent bindings extended");
        }
    }

    fn refresh_if_due(&mut self) {
        let now = self.clock.now();
        if now.duration_since(self.last_refresh) <= self.config.refresh_interval() {
            return;
        }
        self.registry.refresh_all();
        self.last_refresh = now;
        self.refresh_count += 1;
        self.reconcile_consent();
        debug!(frame = self.tick.frame, refreshes = self.refresh_count, "Metrics refreshed");
    }

    fn attach_stats(&mut self) {
        let stats = match self.stats_store.load() {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                self.stats = Some(GamePlayStats::default());
                self.persist_stats();
                GamePlayStats::default()
            }
            Err(e) => {
                warn!("Stored gameplay stats unreadable, tracking this session in memory only: {}", e);
                self.stats_writable = false;
                GamePlayStats::default()
            }
        };
        self.stats = Some(stats);
        debug!(?stats, "Player valid, tracking gameplay stats");
    }

    fn record_distance(&mut self, position: Position) {
        let Some(previous) = self.previous_position else {
            return;
        };
        if let Some(stats) = self.stats.as_mut() {
            stats.add_distance(f64::from(position.distance(&previous)));
        }
        self.previous_position = Some(position);
        self.persist_stats();
    }

    fn record_play_time(&mut self) {
        let now = self.clock.now();
        let minutes = now.duration_since(self.last_play_sample).as_secs_f64() / 60.0;
        if let Some(stats) = self.stats.as_mut() {
            stats.add_play_time_minutes(minutes);
        }
        self.persist_stats();
        self.last_play_sample = now;
    }

    fn persist_stats(&mut self) {
        let Some(stats) = self.stats else {
            return;
        };
        if !self.stats_writable {
            return;
        }
        if let Err(e) = self.stats_store.save(&stats) {
            warn!("Failed to persist gameplay stats: {}", e);
        }
    }

    fn dispatch_metric(&self, id: &str) -> Option<DispatchOutcome> {
        match self.registry.get(id) {
            Some(metric) => Some(self.dispatcher.dispatch(metric, &self.consent)),
            None => {
                debug!(metric = id, "Metric not registered, skipping dispatch");
                None
            }
        }
    }
}
