use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A payload or record could not be turned into JSON.
    #[error("failed to encode telemetry record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport needs a tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
