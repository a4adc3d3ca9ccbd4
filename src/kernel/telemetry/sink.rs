use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::kernel::event::Event;

/// Outbound event primitive. Implementations must hand the event off and return;
/// delivery, batching and retry are theirs, never the caller's.
pub trait EventSink: Send + Sync {
    fn send(&self, namespace: &str, event: Event);
}

/// One handed-off event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentEvent {
    pub namespace: String,
    pub event: Event,
}

/// Forwards events to an async consumer. Full or closed channels drop the event.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SentEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SentEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SentEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn send(&self, namespace: &str, event: Event) {
        let sent = SentEvent {
            namespace: namespace.to_string(),
            event,
        };
        if let Err(e) = self.tx.try_send(sent) {
            warn!("Telemetry event dropped: {}", e);
        }
    }
}

const MAX_EVENTS: usize = 10_000;

/// Keeps the most recent events in memory. Clones share the buffer.
#[derive(Debug, Clone)]
pub struct MemorySink {
    buffer: Arc<Mutex<VecDeque<SentEvent>>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn events(&self) -> Vec<SentEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SentEvent>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for MemorySink {
    fn send(&self, namespace: &str, event: Event) {
        let mut buffer = self.lock();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(SentEvent {
            namespace: namespace.to_string(),
            event,
        });
    }
}

/// Writes each event to the log as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn send(&self, namespace: &str, event: Event) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(namespace, "telemetry {}", json),
            Err(e) => warn!(namespace, "Unserializable telemetry event: {}", e),
        }
    }
}
