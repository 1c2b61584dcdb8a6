use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event::{GameLoopPhase, InputType, SpanPhase, TelemetryEvent};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::time::{elapsed_ms, Clock};
use crate::transport::{Transport, TransportClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Builds telemetry records and forwards them while the collector is acknowledged.
///
/// Connection status is re-read from the transport on every send; records
/// offered while disconnected are dropped for good. Independent clients may
/// coexist, each with its own transport and game-loop id.
pub struct TelemetryClient<T: Transport = TransportClient> {
    transport: T,
    clock: Clock,
    verbose: bool,
    connected: AtomicBool,
    game_loop_id: OnceLock<Uuid>,
}

impl TelemetryClient<TransportClient> {
    /// Connects to the collector on `localhost:<serverport>` in the background.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = TransportClient::connect(&config)?;
        let client = Self::with_transport(transport, config.verbose);
        client.note(format_args!("Starting telemetry client"));
        client.note(format_args!("Client connecting to {}", client.transport.endpoint()));
        Ok(client)
    }

    pub fn create(serverport: u16, verbose: bool) -> Result<Self> {
        Self::new(ClientConfig::new(serverport, verbose))
    }
}

impl<T: Transport> TelemetryClient<T> {
    pub fn with_transport(transport: T, verbose: bool) -> Self {
        Self {
            transport,
            clock: Clock::new(),
            verbose,
            connected: AtomicBool::new(false),
            game_loop_id: OnceLock::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// State computed by the most recent send.
    pub fn connection_state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn refresh_connection_state(&self) -> ConnectionState {
        let acknowledged = self.transport.is_acknowledged();
        self.connected.store(acknowledged, Ordering::SeqCst);
        self.connection_state()
    }

    // Lifecycle chatter is promoted to info only in verbose mode.
    fn note(&self, args: fmt::Arguments<'_>) {
        if self.verbose {
            info!("{}", args);
        } else {
            debug!("{}", args);
        }
    }

    /// Encodes and forwards `event` if the transport is acknowledged right now.
    pub fn send(&self, event: &TelemetryEvent) -> Result<()> {
        match self.refresh_connection_state() {
            ConnectionState::Connected => {
                let text = event.to_json()?;
                self.note(format_args!("Sending data: {}", text));
                self.transport.send(text);
            }
            ConnectionState::Disconnected => {
                self.note(format_args!("Telemetry server not connected, dropping {}", event.id()));
            }
        }
        Ok(())
    }

    // Span records hold no user data, so encoding them cannot fail in practice.
    fn send_span_record(&self, event: TelemetryEvent) {
        if let Err(e) = self.send(&event) {
            warn!("Dropping span record {}: {}", event.id(), e);
        }
    }

    pub fn ensure_game_loop_id(&self) -> Uuid {
        *self.game_loop_id.get_or_init(Uuid::new_v4)
    }

    pub fn game_loop_id(&self) -> Option<Uuid> {
        self.game_loop_id.get().copied()
    }

    /// Wraps one game-loop iteration in `gameloop enter`/`gameloop exit` records.
    ///
    /// The exit record is only sent once `game_loop` completes. If it panics or
    /// the returned future is dropped first, no exit record is ever sent.
    pub async fn instrument_game_loop<F, Fut>(&self, game_loop: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let id = self.ensure_game_loop_id();
        let entered = self.clock.now();
        self.send_span_record(TelemetryEvent::game_loop(GameLoopPhase::Enter, id, entered, None));

        let output = game_loop().await;

        let exited = self.clock.now();
        self.send_span_record(TelemetryEvent::game_loop(
            GameLoopPhase::Exit,
            id,
            exited,
            Some(elapsed_ms(entered, exited)),
        ));
        output
    }

    /// Wraps `work` in an enter/exit span labelled `label`.
    ///
    /// With `use_game_loop_id` set and a game-loop id already created, both
    /// records carry `gameloopID`; otherwise they are sent untagged.
    pub async fn instrument_duration<F, Fut>(
        &self,
        label: &str,
        use_game_loop_id: bool,
        work: F,
    ) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let id = Uuid::new_v4();
        let gameloop_id = if use_game_loop_id { self.game_loop_id() } else { None };

        let entered = self.clock.now();
        self.send_span_record(TelemetryEvent::span(
            label,
            SpanPhase::Enter,
            id,
            gameloop_id,
            entered,
            None,
        ));

        let output = work().await;

        let exited = self.clock.now();
        self.send_span_record(TelemetryEvent::span(
            label,
            SpanPhase::Exit,
            id,
            gameloop_id,
            exited,
            Some(elapsed_ms(entered, exited)),
        ));
        output
    }

    pub fn log_user_defined_event(&self, label: &str, payload: Vec<Value>) -> Result<()> {
        self.send(&TelemetryEvent::user_defined(label, payload, self.clock.now()))
    }

    pub fn log_user_input(
        &self,
        input_type: InputType,
        label: &str,
        event_name: &str,
        input_data: Vec<Value>,
    ) -> Result<()> {
        self.send(&TelemetryEvent::user_input(
            input_type,
            label,
            event_name,
            input_data,
            self.clock.now(),
        ))
    }

    pub fn log_game_state<S: Serialize>(&self, state: &S) -> Result<()> {
        let state = serde_json::to_value(state)?;
        self.send(&TelemetryEvent::game_state(state, self.clock.now()))
    }

    pub fn log_entity_event<E: Serialize, V: Serialize>(&self, entity: &E, event: &V) -> Result<()> {
        let entity = serde_json::to_value(entity)?;
        let event = serde_json::to_value(event)?;
        self.send(&TelemetryEvent::entity(entity, event, self.clock.now()))
    }

    pub fn log_error_event(&self, payload: Vec<Value>) -> Result<()> {
        self.send(&TelemetryEvent::error(None, payload, self.clock.now()))
    }

    /// Like [`log_error_event`](Self::log_error_event), with an `errorMessage` field.
    pub fn log_error_message(&self, message: &str, payload: Vec<Value>) -> Result<()> {
        self.send(&TelemetryEvent::error(
            Some(message.to_string()),
            payload,
            self.clock.now(),
        ))
    }

    /// Closes the transport, flushing records it has already accepted.
    pub async fn shutdown(self) {
        self.note(format_args!("Shutting down telemetry client"));
        self.transport.close().await;
    }
}
