use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::config::{read_json, write_json};
use super::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Per-player running totals. Both values only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GamePlayStats {
    pub distance_traveled: f64,
    pub play_time_minutes: f64,
}

impl GamePlayStats {
    pub fn add_distance(&mut self, delta: f64) {
        if delta.is_finite() && delta > 0.0 {
            self.distance_traveled += delta;
        }
    }

    pub fn add_play_time_minutes(&mut self, minutes: f64) {
        if minutes.is_finite() && minutes > 0.0 {
            self.play_time_minutes += minutes;
        }
    }
}

/// The host's entity store, where the player's aggregate lives between sessions.
pub trait StatsStore: Send {
    /// `Ok(None)` means no aggregate recorded yet. `Err` means one exists but
    /// could not be read, and must not be overwritten.
    fn load(&self) -> Result<Option<GamePlayStats>>;
    fn save(&mut self, stats: &GamePlayStats) -> Result<()>;
}

/// Shared in-process store. Clones see the same slot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatsStore {
    slot: Arc<Mutex<Option<GamePlayStats>>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats(stats: GamePlayStats) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(stats))),
        }
    }

    pub fn current(&self) -> Option<GamePlayStats> {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<GamePlayStats>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatsStore for InMemoryStatsStore {
    fn load(&self) -> Result<Option<GamePlayStats>> {
        Ok(self.current())
    }

    fn save(&mut self, stats: &GamePlayStats) -> Result<()> {
        *self.lock() = Some(*stats);
        Ok(())
    }
}

/// JSON file backed store.
#[derive(Debug, Clone)]
pub struct FileStatsStore {
    path: PathBuf,
}

impl FileStatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatsStore for FileStatsStore {
    fn load(&self) -> Result<Option<GamePlayStats>> {
        read_json(&self.path)
    }

    fn save(&mut self, stats: &GamePlayStats) -> Result<()> {
        write_json(&self.path, stats)
    }
}
