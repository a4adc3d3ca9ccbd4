#![allow(dead_code)]

use std::sync::Arc;

use telemetry_gate::kernel::stats::InMemoryStatsStore;
use telemetry_gate::kernel::telemetry::MemorySink;
use telemetry_gate::kernel::time::ManualClock;
use telemetry_gate::{Event, Metric, MetricRegistry, TelemetryConfig, TelemetrySystem};

/// Metric with fixed fields; every refresh bumps each numeric value by one.
pub struct FixedMetric {
    pub id: String,
    pub category: String,
    pub fields: Vec<(String, i64)>,
}

impl FixedMetric {
    pub fn new(id: &str, category: &str, fields: &[(&str, i64)]) -> Self {
        Self {
            id: id.to_string(),
            category: category.to_string(),
            fields: fields.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        }
    }

    pub fn boxed(id: &str, category: &str, fields: &[(&str, i64)]) -> Box<dyn Metric> {
        Box::new(Self::new(id, category, fields))
    }
}

impl Metric for FixedMetric {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    fn snapshot(&self) -> Event {
        self.fields
            .iter()
            .fold(Event::new(self.id.clone()), |event, (n, v)| event.with_field(n.clone(), *v))
    }

    fn refresh(&mut self) {
        for (_, v) in self.fields.iter_mut() {
            *v += 1;
        }
    }
}

pub struct Harness {
    pub system: TelemetrySystem,
    pub sink: MemorySink,
    pub clock: Arc<ManualClock>,
    pub store: InMemoryStatsStore,
}

pub fn harness(config: TelemetryConfig, metrics: Vec<Box<dyn Metric>>) -> Harness {
    harness_with_store(config, metrics, InMemoryStatsStore::new())
}

pub fn harness_with_store(
    config: TelemetryConfig,
    metrics: Vec<Box<dyn Metric>>,
    store: InMemoryStatsStore,
) -> Harness {
    let mut registry = MetricRegistry::new();
    for metric in metrics {
        registry.register(metric);
    }
    let sink = MemorySink::new();
    let clock = Arc::new(ManualClock::new());
    let system = TelemetrySystem::new(
        config,
        registry,
        Arc::new(sink.clone()),
        Box::new(store.clone()),
        clock.clone(),
    );
    Harness { system, sink, clock, store }
}

pub fn sent_schemas(sink: &MemorySink) -> Vec<String> {
    sink.events().into_iter().map(|s| s.event.schema).collect()
}
