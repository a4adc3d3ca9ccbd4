use crate::kernel::event::Event;

/// Well-known metric identifiers.
pub mod ids {
    pub const MODULES: &str = "modules";
    pub const SYSTEM_CONTEXT: &str = "system_context";
    pub const BLOCK_DESTROYED: &str = "block_destroyed";
    pub const BLOCK_PLACED: &str = "block_placed";
    pub const GAME_CONFIGURATION: &str = "game_configuration";
    pub const GAME_PLAY: &str = "game_play";
    pub const MONSTER_KILLED: &str = "monster_killed";

    /// Sent once when the session begins.
    pub const BOOTSTRAP: [&str; 2] = [MODULES, SYSTEM_CONTEXT];

    /// Sent once at shutdown, never periodically.
    pub const TERMINAL: [&str; 5] = [
        BLOCK_DESTROYED,
        BLOCK_PLACED,
        GAME_CONFIGURATION,
        GAME_PLAY,
        MONSTER_KILLED,
    ];
}

/// A pluggable producer of categorized snapshots.
///
/// The category is part of the contract rather than looked up from type metadata,
/// so a metric must always report the same `category()` and `identifier()`.
pub trait Metric: Send {
    /// Stable registry key.
    fn identifier(&self) -> &str;

    /// Coarse consent gate shared by one or more metrics.
    fn category(&self) -> &str;

    /// Field names this metric may report, in a stable order.
    /// Each is also a consent key.
    fn field_names(&self) -> Vec<String>;

    /// Current value. Must not mutate the metric.
    fn snapshot(&self) -> Event;

    /// Recompute the internal value in place. Called on every periodic refresh.
    fn refresh(&mut self) {}
}
