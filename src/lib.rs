pub mod kernel;

// Re-export specific items for convenient access
pub use kernel::config::TelemetryConfig;
pub use kernel::consent::ConsentStore;
pub use kernel::error::TelemetryError;
pub use kernel::event::Event;
pub use kernel::scheduler::{Lifecycle, TelemetrySystem};
pub use kernel::stats::{GamePlayStats, Position};
pub use kernel::telemetry::{Dispatcher, EventSink, Metric, MetricRegistry};
