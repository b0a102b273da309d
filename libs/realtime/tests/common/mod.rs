//! Common test utilities for realtime integration tests
//!
//! - [`MockConnector`]: in-memory transport with a scripted dial outcome per
//!   attempt, for deterministic paused-clock tests
//! - [`MockWsServer`]: a real WebSocket server on localhost for end-to-end
//!   checks of the tokio-tungstenite transport

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use realtime::{
    ChannelMessage, CloseInfo, ConnectRequest, Connection, Connector, RealtimeError, Result,
    TransportEvent, WsMessage,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Let spawned tasks run until they block again
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Outcome of one dial attempt
#[derive(Debug, Clone)]
pub enum Dial {
    Accept,
    Refuse(String),
}

struct ConnectorInner {
    script: Mutex<VecDeque<Dial>>,
    dials: AtomicUsize,
    requests: Mutex<Vec<ConnectRequest>>,
    servers: mpsc::UnboundedSender<ServerSide>,
}

/// In-memory connector
///
/// Each dial pops the next scripted outcome; once the script is empty every
/// dial is refused. Accepted dials hand the server end to the test through
/// the receiver returned by [`MockConnector::new`].
#[derive(Clone)]
pub struct MockConnector {
    inner: Arc<ConnectorInner>,
}

impl MockConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerSide>) {
        let (servers, server_rx) = mpsc::unbounded_channel();
        let connector = Self {
            inner: Arc::new(ConnectorInner {
                script: Mutex::new(VecDeque::new()),
                dials: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                servers,
            }),
        };
        (connector, server_rx)
    }

    /// Append outcomes for the next dials
    pub fn script(&self, outcomes: impl IntoIterator<Item = Dial>) {
        self.inner.script.lock().extend(outcomes);
    }

    /// Accept the next `n` dials
    pub fn accept(&self, n: usize) {
        self.script(std::iter::repeat(Dial::Accept).take(n));
    }

    pub fn dials(&self) -> usize {
        self.inner.dials.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.inner.requests.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, request: ConnectRequest) -> Result<Box<dyn Connection>> {
        self.inner.dials.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.lock().push(request);

        let outcome = self
            .inner
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Dial::Refuse("connection refused".into()));

        match outcome {
            Dial::Accept => {
                let (to_client, inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                let close_code = Arc::new(Mutex::new(None));

                let _ = self.inner.servers.send(ServerSide {
                    to_client,
                    from_client,
                    close_code: Arc::clone(&close_code),
                });

                Ok(Box::new(MockConnection {
                    outbound,
                    inbound,
                    close_code,
                }))
            }
            Dial::Refuse(reason) => Err(RealtimeError::WebSocket(reason)),
        }
    }
}

struct MockConnection {
    outbound: mpsc::UnboundedSender<WsMessage>,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    close_code: Arc<Mutex<Option<u16>>>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&mut self, message: WsMessage) -> Result<()> {
        self.outbound
            .send(message)
            .map_err(|_| RealtimeError::ConnectionClosed("server end dropped".into()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        match self.inbound.recv().await {
            Some(event) => event,
            None => TransportEvent::Closed(CloseInfo::abnormal("server end dropped")),
        }
    }

    async fn close(&mut self, code: u16, _reason: &str) -> Result<()> {
        *self.close_code.lock() = Some(code);
        Ok(())
    }
}

/// Server end of one accepted mock connection
pub struct ServerSide {
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<WsMessage>,
    close_code: Arc<Mutex<Option<u16>>>,
}

impl ServerSide {
    /// Deliver a `{type, data, timestamp}` frame
    pub fn push(&self, kind: &str, data: Value, timestamp: i64) {
        let frame = json!({ "type": kind, "data": data, "timestamp": timestamp });
        self.push_raw(&frame.to_string());
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.to_client.send(TransportEvent::Frame(WsMessage::Text(text.to_string())));
    }

    pub fn transport_error(&self, reason: &str) {
        let _ = self.to_client.send(TransportEvent::Error(reason.to_string()));
    }

    /// Lose the connection without a close handshake
    pub fn drop_unclean(&self) {
        let _ = self
            .to_client
            .send(TransportEvent::Closed(CloseInfo::abnormal("connection reset")));
    }

    /// Close with a specific code from the server side
    pub fn close_with(&self, code: u16) {
        let _ = self
            .to_client
            .send(TransportEvent::Closed(CloseInfo::from_code(code, "server closing")));
    }

    /// Every message the client has sent so far
    pub fn received(&mut self) -> Vec<ChannelMessage> {
        let mut messages = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            if let Ok(message) = ChannelMessage::parse(&frame) {
                messages.push(message);
            }
        }
        messages
    }

    /// Close code the client used, if it closed this connection
    pub fn client_close_code(&self) -> Option<u16> {
        *self.close_code.lock()
    }
}

/// Count messages of one kind
pub fn count_kind(messages: &[ChannelMessage], kind: &str) -> usize {
    messages.iter().filter(|m| m.is(kind)).count()
}

/// Channel names carried by the messages of one kind, in send order
pub fn channels_of(messages: &[ChannelMessage], kind: &str) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.is(kind))
        .filter_map(|m| m.data["channel"].as_str().map(str::to_string))
        .collect()
}

/// A simple WebSocket server for end-to-end tests
///
/// Every accepted connection gets a `{"type":"welcome"}` frame and then has
/// text frames echoed back. A client `ping` message is answered with a
/// `pong` message. The sub-protocol requested by the client (if any) is
/// accepted and recorded.
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    protocols: Arc<Mutex<Vec<String>>>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let protocols = Arc::new(Mutex::new(Vec::new()));

        let shutdown_clone = Arc::clone(&shutdown);
        let protocols_clone = Arc::clone(&protocols);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = Arc::clone(&shutdown_clone);
                                let protocols = Arc::clone(&protocols_clone);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown, protocols).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            protocols,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        shutdown: Arc<Notify>,
        protocols: Arc<Mutex<Vec<String>>>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
        use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
        use tokio_tungstenite::tungstenite::Message;

        let callback = |request: &Request, mut response: Response| -> std::result::Result<Response, ErrorResponse> {
            if let Some(requested) = request.headers().get(SEC_WEBSOCKET_PROTOCOL) {
                let requested = requested.to_str().unwrap_or_default().to_string();
                let first = requested.split(',').next().unwrap_or_default().trim().to_string();
                protocols.lock().push(requested);
                if let Ok(value) = first.parse() {
                    response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                }
            }
            Ok(response)
        };

        let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let welcome = json!({ "type": "welcome", "timestamp": 1 }).to_string();
        if write.send(Message::Text(welcome)).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let reply = match serde_json::from_str::<Value>(&text) {
                                Ok(value) if value["type"] == "ping" => {
                                    json!({ "type": "pong", "timestamp": value["timestamp"] }).to_string()
                                }
                                _ => text,
                            };
                            if write.send(Message::Text(reply)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Sub-protocol headers seen during handshakes
    pub fn requested_protocols(&self) -> Vec<String> {
        self.protocols.lock().clone()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
