pub mod config;
pub mod error;
pub mod telemetry;
pub mod time;
pub mod transport;

pub use config::ClientConfig;
pub use error::TelemetryError;
pub use telemetry::{ConnectionState, InputType, TelemetryClient, TelemetryEvent};
pub use transport::{MemoryTransport, Signal, Transport, TransportClient};
