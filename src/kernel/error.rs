use std::path::PathBuf;
use thiserror::Error;

/// Failures of the persistence/configuration layer around the telemetry core.
/// The lifecycle itself never surfaces these to the host.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed telemetry data in {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl TelemetryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TelemetryError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        TelemetryError::Serialization {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
