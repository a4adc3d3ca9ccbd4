use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::error::{Result, TelemetryError};

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_NAMESPACE: &str = "TelemetrySystem";

/// Host-side telemetry configuration.
/// The core reads `telemetry_enabled` and reads/extends `bindings`; nothing else writes here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Global opt-in flag. Also the default for consent keys seen for the first time.
    pub telemetry_enabled: bool,
    /// Persisted consent binding map: category or field id -> allowed.
    pub bindings: BTreeMap<String, bool>,
    /// Refresh fires only once strictly more than this many seconds have elapsed.
    pub refresh_interval_secs: u64,
    /// Namespace handed to the sink with every event.
    pub namespace: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            telemetry_enabled: false,
            bindings: BTreeMap::new(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn enabled() -> Self {
        Self {
            telemetry_enabled: true,
            ..Self::default()
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(read_json(path.as_ref())?.unwrap_or_default())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self)
    }
}

/// Reads a JSON document, `Ok(None)` when the file does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| TelemetryError::io(path, e))?;
    let value = serde_json::from_str(&content).map_err(|e| TelemetryError::serialization(path, e))?;
    Ok(Some(value))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| TelemetryError::serialization(path, e))?;
    fs::write(path, json).map_err(|e| TelemetryError::io(path, e))
}
