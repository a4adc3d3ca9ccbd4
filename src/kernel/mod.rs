pub mod config;
pub mod consent;
pub mod error;
pub mod event;
pub mod scheduler;
pub mod stats;
pub mod telemetry;
pub mod time;
