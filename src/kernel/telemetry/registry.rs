use tracing::{debug, trace};

use super::metric::Metric;

/// Explicit registration table of active metrics.
/// Insertion order is kept so reconciliation and refresh run deterministically.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: Vec<Box<dyn Metric>>,
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.metrics.iter().map(|m| m.identifier()))
            .finish()
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `metric`. An existing metric with the same identifier is replaced in place.
    pub fn register(&mut self, metric: Box<dyn Metric>) {
        let id = metric.identifier().to_string();
        match self.metrics.iter_mut().find(|m| m.identifier() == id) {
            Some(slot) => {
                debug!(metric = %id, "Replacing registered metric");
                *slot = metric;
            }
            None => {
                debug!(metric = %id, category = metric.category(), "Registered metric");
                self.metrics.push(metric);
            }
        }
    }

    /// Absent ids are routine: the metric may simply not be loaded.
    pub fn get(&self, id: &str) -> Option<&dyn Metric> {
        self.metrics
            .iter()
            .find(|m| m.identifier() == id)
            .map(|m| &**m)
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn Metric> {
        self.metrics.iter().map(|m| &**m)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn refresh_all(&mut self) {
        trace!(count = self.metrics.len(), "Refreshing metrics");
        for metric in self.metrics.iter_mut() {
            metric.refresh();
        }
    }
}
