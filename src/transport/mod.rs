//! Transport layer: delivers encoded records to the collector and tracks
//! whether the collector has acknowledged the connection.
//!
//! The acknowledged flag is the only state owned here. Reconnection of an
//! established session belongs to the socket.io runtime.

pub mod memory;
pub mod socket;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

pub use memory::MemoryTransport;
pub use socket::TransportClient;

/// Sink for encoded telemetry records.
pub trait Transport: Send + Sync {
    /// Point-in-time snapshot of the last signal received.
    fn is_acknowledged(&self) -> bool;

    /// Fire-and-forget delivery of one JSON text record.
    fn send(&self, text: String);

    /// Stops delivery. Records already handed to `send` are flushed first
    /// where the transport supports it.
    fn close(&self) -> BoxFuture<'static, ()> {
        async {}.boxed()
    }
}

/// Inbound transport signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Connect,
    Acknowledgment,
    Disconnect,
}

impl Signal {
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "connect" | "open" => Some(Signal::Connect),
            "acknowledgment" => Some(Signal::Acknowledgment),
            "disconnect" | "close" => Some(Signal::Disconnect),
            _ => None,
        }
    }
}

/// Unacknowledged/Acknowledged flag shared between signal handlers and senders.
#[derive(Debug, Clone, Default)]
pub struct SignalState {
    acknowledged: Arc<AtomicBool>,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, signal: Signal) {
        match signal {
            Signal::Connect => {}
            Signal::Acknowledgment => self.acknowledged.store(true, Ordering::SeqCst),
            Signal::Disconnect => self.acknowledged.store(false, Ordering::SeqCst),
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }
}
