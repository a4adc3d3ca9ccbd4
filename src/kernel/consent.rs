use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-key consent flags, keyed by category id or field name.
///
/// Append-only: reconciliation only ever adds keys. Flipping an existing key is
/// an explicit user decision and goes through [`ConsentStore::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentStore {
    bindings: BTreeMap<String, bool>,
}

impl ConsentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(bindings: BTreeMap<String, bool>) -> Self {
        Self { bindings }
    }

    /// `None` means "not yet decided", which is distinct from an explicit `false`.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.bindings.get(key).copied()
    }

    /// Only an explicit `true` grants.
    pub fn is_granted(&self, key: &str) -> bool {
        self.get(key) == Some(true)
    }

    /// Inserts `key -> fallback` if absent. Returns whether an insertion happened.
    pub fn ensure_default(&mut self, key: &str, fallback: bool) -> bool {
        if self.bindings.contains_key(key) {
            return false;
        }
        debug!(key, fallback, "Consent key first observed");
        self.bindings.insert(key.to_string(), fallback);
        true
    }

    /// Explicit user decision.
    pub fn set(&mut self, key: impl Into<String>, allowed: bool) {
        self.bindings.insert(key.into(), allowed);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn bindings(&self) -> &BTreeMap<String, bool> {
        &self.bindings
    }
}
