use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Immutable snapshot produced by a metric at refresh time.
/// The dispatcher derives filtered copies from it; the original is never touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Schema / kind of the event, usually the producing metric's identifier.
    pub schema: String,
    data: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            data: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion. A repeated name overwrites the previous value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy of this event keeping only the fields for which `keep` returns true.
    pub fn retain_fields<F>(&self, mut keep: F) -> Event
    where
        F: FnMut(&str) -> bool,
    {
        Event {
            schema: self.schema.clone(),
            data: self
                .data
                .iter()
                .filter(|(name, _)| keep(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}
