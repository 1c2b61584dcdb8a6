//! Game telemetry: event records and the client that emits them.
//!
//! # DELIVERY
//! Best effort only. A record is sent if the collector has acknowledged the
//! connection at the moment of the call, and is otherwise lost. Nothing is
//! queued or retried.
//!
//! # SPANS
//! Game-loop and duration spans are pairs of enter/exit records sharing one
//! id. A span whose work never completes has no exit record.

pub mod client;
pub mod event;

pub use client::{ConnectionState, TelemetryClient};
pub use event::{InputType, TelemetryEvent};
