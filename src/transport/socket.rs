use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Signal, SignalState, Transport};
use crate::config::ClientConfig;
use crate::error::Result;

/// Outbound signal carrying one JSON-encoded record.
pub const DATA_EVENT: &str = "datasend";
pub const ACK_EVENT: &str = "acknowledgment";

/// socket.io connection to the local collector.
///
/// `send` never blocks: records go through a FIFO channel to a single writer
/// task, so the collector sees them in call order.
pub struct TransportClient {
    endpoint: String,
    signals: SignalState,
    outbox: mpsc::UnboundedSender<String>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TransportClient {
    /// Starts connecting in the background. Must be called inside a tokio runtime.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()?;

        let endpoint = config.endpoint_url();
        let signals = SignalState::new();
        let (outbox, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let task = runtime.spawn(run(
            endpoint.clone(),
            config.connect_retry(),
            signals.clone(),
            rx,
            shutdown.clone(),
        ));

        Ok(Self {
            endpoint,
            signals,
            outbox,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for TransportClient {
    fn is_acknowledged(&self) -> bool {
        self.signals.is_acknowledged()
    }

    fn send(&self, text: String) {
        if self.outbox.send(text).is_err() {
            debug!("Transport to {} already closed, record dropped", self.endpoint);
        }
    }

    fn close(&self) -> BoxFuture<'static, ()> {
        self.shutdown.cancel();
        let task = self.task.lock().ok().and_then(|mut slot| slot.take());
        async move {
            if let Some(task) = task {
                if let Err(e) = task.await {
                    warn!("Transport task ended abnormally: {}", e);
                }
            }
        }
        .boxed()
    }
}

impl Drop for TransportClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn on_signal(
    signals: SignalState,
    signal: Signal,
) -> impl FnMut(Payload, Client) -> BoxFuture<'static, ()> + Send + Sync + 'static {
    move |_payload, _client| {
        debug!("Transport signal: {:?}", signal);
        signals.apply(signal);
        async {}.boxed()
    }
}

// A signal emitted without data arrives as a bare message holding only its name.
fn on_bare_signal(
    signals: SignalState,
) -> impl FnMut(Payload, Client) -> BoxFuture<'static, ()> + Send + Sync + 'static {
    move |payload, _client| {
        if let Payload::Text(values) = &payload {
            if let [Value::String(name)] = values.as_slice() {
                if let Some(signal) = Signal::from_event_name(name) {
                    debug!("Transport signal: {:?}", signal);
                    signals.apply(signal);
                }
            }
        }
        async {}.boxed()
    }
}

fn builder(endpoint: &str, signals: &SignalState) -> ClientBuilder {
    ClientBuilder::new(endpoint)
        .on(Event::Connect, on_signal(signals.clone(), Signal::Connect))
        .on(ACK_EVENT, on_signal(signals.clone(), Signal::Acknowledgment))
        .on(Event::Message, on_bare_signal(signals.clone()))
        .on(Event::Close, on_signal(signals.clone(), Signal::Disconnect))
        // Dropped streams never produce a close packet, only an error.
        .on(Event::Error, on_signal(signals.clone(), Signal::Disconnect))
}

async fn run(
    endpoint: String,
    retry: Duration,
    signals: SignalState,
    mut outbox: mpsc::UnboundedReceiver<String>,
    shutdown: CancellationToken,
) {
    // The socket.io runtime reconnects established sessions on its own but
    // gives up on a failed first connect, so the first one is retried here.
    let client = loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            attempt = builder(&endpoint, &signals).connect() => match attempt {
                Ok(client) => break client,
                Err(e) => debug!("Collector at {} unreachable: {}", endpoint, e),
            },
        }
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(retry) => {}
        }
    };
    info!("Transport connected to {}", endpoint);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = outbox.recv() => match next {
                Some(text) => emit(&client, &signals, text).await,
                None => break,
            },
        }
    }

    // Flush what was accepted before shutdown.
    outbox.close();
    while let Ok(text) = outbox.try_recv() {
        emit(&client, &signals, text).await;
    }

    signals.apply(Signal::Disconnect);
    if let Err(e) = client.disconnect().await {
        debug!("Disconnect from {} failed: {}", endpoint, e);
    }
}

async fn emit(client: &Client, signals: &SignalState, text: String) {
    let payload = Payload::Text(vec![Value::String(text)]);
    if let Err(e) = client.emit(DATA_EVENT, payload).await {
        warn!("Failed to emit {}, waiting for a fresh acknowledgment: {}", DATA_EVENT, e);
        signals.apply(Signal::Disconnect);
    }
}
