use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{Signal, SignalState, Transport};

/// In-process transport that records every delivered record.
///
/// Clones share the same signal state and record log, so a handle kept by
/// the caller observes what a client sends.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    signals: SignalState,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self, signal: Signal) {
        self.signals.apply(signal);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Sent records decoded back into JSON; undecodable entries are skipped.
    pub fn sent_records(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|log| log.len()).unwrap_or(0)
    }
}

impl Transport for MemoryTransport {
    fn is_acknowledged(&self) -> bool {
        self.signals.is_acknowledged()
    }

    fn send(&self, text: String) {
        if let Ok(mut log) = self.sent.lock() {
            log.push(text);
        }
    }
}
