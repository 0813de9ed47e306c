// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

#![allow(dead_code)]

use bytes::Bytes;
use relaychat::config::Config;
use relaychat::connection::Session;
use relaychat::core::bus::fan_out;
use relaychat::core::state::ServerState;
use relaychat::server::{self, RunningServer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// How long a test waits for a single line before failing.
pub const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Sets up minimal tracing for tests (ignores the error if already initialized).
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("warn"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// A config for a server bound to an ephemeral loopback port.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Config::default()
    }
}

/// Starts a server in the background with the given config.
pub async fn start_server(config: Config) -> RunningServer {
    init_tracing();
    server::spawn(config).await.unwrap()
}

/// TestContext provides a server state without any sockets or background tasks.
/// Bus traffic stays in `bus_rx` until a test drains it.
pub struct TestContext {
    pub state: Arc<ServerState>,
    pub bus_rx: mpsc::Receiver<Bytes>,
    next_port: u16,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        let init = ServerState::initialize(config);
        Self {
            state: init.state,
            bus_rx: init.bus_rx,
            next_port: 40000,
        }
    }

    /// Creates an unregistered session with a fresh loopback address.
    pub fn new_session(&mut self) -> (Arc<Session>, mpsc::Receiver<Bytes>) {
        self.next_port += 1;
        let addr: SocketAddr = format!("127.0.0.1:{}", self.next_port).parse().unwrap();
        Session::new(
            self.state.next_session_id(),
            addr,
            self.state.config.outbound_queue_capacity,
        )
    }

    /// Creates a session and registers it under `identity`.
    pub fn join(&mut self, identity: &str) -> (Arc<Session>, mpsc::Receiver<Bytes>) {
        let (session, rx) = self.new_session();
        self.state.registry.insert(identity, session.clone()).unwrap();
        (session, rx)
    }

    /// Fans out everything currently waiting on the bus, as the dispatcher would.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(payload) = self.bus_rx.try_recv() {
            fan_out(&self.state, payload);
            count += 1;
        }
        count
    }

    /// Takes the next payload published on the bus, as text.
    pub fn next_bus_message(&mut self) -> Option<String> {
        self.bus_rx.try_recv().ok().map(into_string)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything currently queued for a session, as text.
pub fn drain(rx: &mut mpsc::Receiver<Bytes>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        out.push(into_string(payload));
    }
    out
}

pub fn into_string(payload: Bytes) -> String {
    String::from_utf8(payload.to_vec()).unwrap()
}

/// A line-oriented TCP client.
pub struct LineClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// The identity the server assigned on join: this client's address.
    pub identity: String,
}

impl LineClient {
    /// Connects and waits for the client's own join notice.
    pub async fn connect(addr: SocketAddr) -> Self {
        let mut client = Self::connect_raw(addr).await;
        let joined = format!("[official notify] {} joined", client.identity);
        client.expect_line(&joined).await;
        client
    }

    /// Connects without reading anything.
    pub async fn connect_raw(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let identity = stream.local_addr().unwrap().to_string();
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            identity,
        }
    }

    pub async fn send_line(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    /// Reads one line without its terminator. `None` means the server closed the connection.
    pub async fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = tokio::time::timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap_or(0);
        if n == 0 {
            return None;
        }
        Some(line.trim_end_matches('\n').to_string())
    }

    /// Reads one line and asserts it equals `expected`.
    pub async fn expect_line(&mut self, expected: &str) {
        let line = self.read_line().await;
        assert_eq!(line.as_deref(), Some(expected));
    }

    /// Skips lines until one equals `expected`.
    pub async fn skip_until(&mut self, expected: &str) {
        loop {
            match self.read_line().await {
                Some(line) if line == expected => return,
                Some(_) => continue,
                None => panic!("connection closed before seeing {expected:?}"),
            }
        }
    }

    /// Asserts that nothing arrives within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) {
        let mut line = String::new();
        if let Ok(res) = tokio::time::timeout(wait, self.reader.read_line(&mut line)).await {
            panic!("expected silence, got {res:?}: {line:?}");
        }
    }

    /// Waits until the server closes the connection, skipping whatever arrives first.
    pub async fn expect_closed(&mut self) {
        while self.read_line().await.is_some() {}
    }
}
