use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gametel::config::ClientConfig;
use gametel::transport::Transport;
use gametel::{ConnectionState, TelemetryClient};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// Engine.IO v4 over HTTP long-polling, with no websocket upgrade offered.
const SEPARATOR: &str = "\u{1e}";
const HANDSHAKE: &str = r#"0{"sid":"collector","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
const NAMESPACE_ACCEPT: &str = r#"40{"sid":"telemetry"}"#;
const NOOP: &str = "6";
const POLL_HOLD: Duration = Duration::from_millis(500);

#[derive(Clone)]
struct Shared {
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>,
    inbound: Arc<Mutex<Vec<String>>>,
}

/// Loopback collector speaking just enough socket.io to drive the transport.
struct LoopbackCollector {
    port: u16,
    shared: Shared,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl LoopbackCollector {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shared = Shared {
            outbound_tx,
            outbound_rx: Arc::new(tokio::sync::Mutex::new(outbound_rx)),
            inbound: Arc::default(),
        };
        let tasks: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::default();

        let accept_shared = shared.clone();
        let accept_tasks = tasks.clone();
        let accept = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let connection = tokio::spawn(serve(stream, accept_shared.clone()));
                accept_tasks.lock().unwrap().push(connection);
            }
        });
        tasks.lock().unwrap().push(accept);

        Self { port, shared, tasks }
    }

    /// Queues a raw Engine.IO packet for the next poll.
    fn push(&self, packet: &str) {
        self.shared.outbound_tx.send(packet.to_string()).unwrap();
    }

    fn inbound(&self) -> Vec<String> {
        self.shared.inbound.lock().unwrap().clone()
    }

    fn datasend_frames(&self) -> Vec<String> {
        self.inbound()
            .into_iter()
            .filter(|packet| packet.starts_with(r#"42["datasend""#))
            .collect()
    }

    /// Drops the listener and every open connection, like a crashed process.
    fn kill(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}

async fn serve(stream: TcpStream, shared: Shared) {
    let mut reader = BufReader::new(stream);
    loop {
        let mut request_line = String::new();
        match reader.read_line(&mut request_line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            match reader.read_line(&mut header).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        let mut body = vec![0; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }

        let payload = respond(&request_line, &String::from_utf8_lossy(&body), &shared).await;
        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=UTF-8\r\nContent-Length: {}\r\n\r\n{}",
            payload.len(),
            payload
        );
        if reader.get_mut().write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

async fn respond(request_line: &str, body: &str, shared: &Shared) -> String {
    if request_line.starts_with("POST") {
        for packet in body.split(SEPARATOR) {
            if packet.starts_with("40") {
                let _ = shared.outbound_tx.send(NAMESPACE_ACCEPT.to_string());
            }
            shared.inbound.lock().unwrap().push(packet.to_string());
        }
        return "ok".to_string();
    }

    if !request_line.contains("sid=") {
        return HANDSHAKE.to_string();
    }

    let mut outbound = shared.outbound_rx.lock().await;
    let first = match tokio::time::timeout(POLL_HOLD, outbound.recv()).await {
        Ok(Some(packet)) => packet,
        _ => return NOOP.to_string(),
    };
    let mut packets = vec![first];
    while let Ok(packet) = outbound.try_recv() {
        packets.push(packet);
    }
    packets.join(SEPARATOR)
}

async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(Instant::now() < deadline, "Timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn client_for(collector: &LoopbackCollector) -> TelemetryClient {
    let mut config = ClientConfig::new(collector.port, false);
    config.host = "127.0.0.1".to_string();
    config.connect_retry_ms = 50;
    TelemetryClient::new(config).unwrap()
}

async fn wait_for_namespace(collector: &LoopbackCollector) {
    wait_until("namespace connect", || {
        collector.inbound().iter().any(|packet| packet.starts_with("40"))
    })
    .await;
}

async fn acknowledge(collector: &LoopbackCollector, client: &TelemetryClient, packet: &str) {
    wait_for_namespace(collector).await;
    collector.push(packet);
    wait_until("acknowledgment", || client.transport().is_acknowledged()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bare_acknowledgment_enables_datasend() {
    let collector = LoopbackCollector::start().await;
    let client = client_for(&collector);

    client.log_game_state(&json!({ "score": 1 })).unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    acknowledge(&collector, &client, r#"42["acknowledgment"]"#).await;

    client.log_game_state(&json!({ "score": 10 })).unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Connected);
    wait_until("datasend frame", || collector.datasend_frames().len() == 1).await;

    let frame = collector.datasend_frames().remove(0);
    let contents: Value = serde_json::from_str(&frame[2..]).unwrap();
    let contents = contents.as_array().unwrap();
    assert_eq!(contents.len(), 2, "Event name plus one text argument");
    assert_eq!(contents[0], "datasend");

    let text = contents[1].as_str().expect("Record should travel as JSON text");
    let record: Value = serde_json::from_str(text).unwrap();
    assert_eq!(record["type"], "gameState");
    assert_eq!(record["state"], json!({ "score": 10 }));
    assert!(record["ts"].is_number());
    assert!(!record["id"].as_str().unwrap().is_empty());

    tokio::time::timeout(Duration::from_secs(5), client.shutdown())
        .await
        .expect("Shutdown should finish");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_acknowledgment_with_data() {
    let collector = LoopbackCollector::start().await;
    let client = client_for(&collector);
    wait_for_namespace(&collector).await;

    collector.push(r#"42["welcome"]"#);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!client.transport().is_acknowledged(), "Unrelated messages change nothing");

    acknowledge(&collector, &client, r#"42["acknowledgment","ok"]"#).await;

    client.log_user_defined_event("hello", vec![json!(1)]).unwrap();
    wait_until("datasend frame", || collector.datasend_frames().len() == 1).await;

    tokio::time::timeout(Duration::from_secs(5), client.shutdown())
        .await
        .expect("Shutdown should finish");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_disconnect_clears_acknowledgment() {
    let collector = LoopbackCollector::start().await;
    let client = client_for(&collector);
    acknowledge(&collector, &client, r#"42["acknowledgment","ok"]"#).await;

    collector.push("41");
    wait_until("disconnect", || !client.transport().is_acknowledged()).await;

    client.log_game_state(&json!({ "score": 2 })).unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert!(collector.datasend_frames().is_empty());

    let _ = tokio::time::timeout(Duration::from_secs(5), client.shutdown()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_collector_death_clears_acknowledgment() {
    let collector = LoopbackCollector::start().await;
    let client = client_for(&collector);
    acknowledge(&collector, &client, r#"42["acknowledgment"]"#).await;

    collector.kill();
    wait_until("flag cleared after collector died", || {
        let _ = client.log_game_state(&json!({ "score": 3 }));
        !client.transport().is_acknowledged()
    })
    .await;

    client.log_game_state(&json!({ "score": 4 })).unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    let _ = tokio::time::timeout(Duration::from_secs(5), client.shutdown()).await;
}
