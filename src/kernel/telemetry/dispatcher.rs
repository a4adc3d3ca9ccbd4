use std::sync::Arc;
use tracing::{debug, trace};

use super::metric::Metric;
use super::sink::EventSink;
use crate::kernel::consent::ConsentStore;

/// What a single dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the sink with this many fields.
    Sent { fields: usize },
    /// Category not granted; the sink was not called.
    Withheld,
}

/// Consent filter in front of the sink.
///
/// Category consent decides whether anything is sent at all. Field consent decides
/// which values make it into the payload. A field is included only on an explicit
/// `true`; an unknown key counts as not granted.
pub struct Dispatcher {
    sink: Arc<dyn EventSink>,
    namespace: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("namespace", &self.namespace).finish()
    }
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn EventSink>, namespace: impl Into<String>) -> Self {
        Self {
            sink,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn dispatch(&self, metric: &dyn Metric, consent: &ConsentStore) -> DispatchOutcome {
        let category = metric.category();
        if !consent.is_granted(category) {
            debug!(metric = metric.identifier(), category, "Category not granted, withholding");
            return DispatchOutcome::Withheld;
        }

        let allowed: Vec<String> = metric
            .field_names()
            .into_iter()
            .filter(|field| consent.is_granted(field))
            .collect();

        let snapshot = metric.snapshot();
        let payload = snapshot.retain_fields(|field| allowed.iter().any(|a| a == field));
        let fields = payload.len();

        trace!(
            metric = metric.identifier(),
            fields,
            redacted = snapshot.len() - fields,
            "Dispatching"
        );
        self.sink.send(&self.namespace, payload);
        DispatchOutcome::Sent { fields }
    }
}
