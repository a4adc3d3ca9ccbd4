//! Consent-gated metric dispatch.
//!
//! # PRIVACY INVARIANT
//! Nothing reaches an [`EventSink`] unless its category is explicitly granted,
//! and no field reaches it unless that field is explicitly granted too.

pub mod dispatcher;
pub mod metric;
pub mod registry;
pub mod sink;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use metric::{ids, Metric};
pub use registry::MetricRegistry;
pub use sink::{ChannelSink, EventSink, LogSink, MemorySink, SentEvent};
