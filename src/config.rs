use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TelemetryError};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_CONNECT_RETRY_MS: u64 = 1_000;

const PORT_VAR: &str = "GAMETEL_PORT";
const VERBOSE_VAR: &str = "GAMETEL_VERBOSE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub serverport: u16,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_host")]
    pub host: String,
    /// Delay between attempts while the first connection is still pending.
    #[serde(default = "default_connect_retry_ms")]
    pub connect_retry_ms: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_connect_retry_ms() -> u64 {
    DEFAULT_CONNECT_RETRY_MS
}

impl ClientConfig {
    pub fn new(serverport: u16, verbose: bool) -> Self {
        Self {
            serverport,
            verbose,
            host: default_host(),
            connect_retry_ms: DEFAULT_CONNECT_RETRY_MS,
        }
    }

    /// Reads `GAMETEL_PORT` (required) and `GAMETEL_VERBOSE` (optional, `1`/`true`).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var(PORT_VAR)
            .map_err(|_| TelemetryError::Config(format!("{PORT_VAR} is not set")))?;
        let verbose = std::env::var(VERBOSE_VAR).ok();
        Self::from_values(&port, verbose.as_deref())
    }

    pub fn from_values(port: &str, verbose: Option<&str>) -> Result<Self> {
        let serverport = port
            .trim()
            .parse::<u16>()
            .map_err(|e| TelemetryError::Config(format!("bad port {port:?}: {e}")))?;
        let verbose = matches!(
            verbose.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("1") | Some("true") | Some("yes")
        );
        Ok(Self::new(serverport, verbose))
    }

    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}", self.host, self.serverport)
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }
}
