//! Production transport on top of tokio-tungstenite

use crate::traits::*;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{self, header::SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Opens WebSocket connections with `connect_async`
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, request: ConnectRequest) -> Result<Box<dyn Connection>> {
        let mut http_request = request
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::Configuration(format!("Invalid URL '{}': {}", request.url, e)))?;

        if !request.protocols.is_empty() {
            let protocols = request.protocols.join(", ");
            match protocols.parse::<http::HeaderValue>() {
                Ok(value) => {
                    http_request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                }
                Err(_) => warn!("Invalid sub-protocol list: {}", protocols),
            }
        }

        // Apply extra handshake headers
        for (key, value) in request.headers {
            match key.parse::<http::header::HeaderName>() {
                Ok(header_name) => match value.parse::<http::header::HeaderValue>() {
                    Ok(header_value) => {
                        http_request.headers_mut().insert(header_name, header_value);
                    }
                    Err(_) => warn!("Invalid header value for key '{}'", key),
                },
                Err(_) => warn!("Invalid header name: {}", key),
            }
        }

        let (stream, _response) = connect_async(http_request)
            .await
            .map_err(|e| RealtimeError::WebSocket(e.to_string()))?;

        debug!("WebSocket handshake completed with {}", request.url);

        Ok(Box::new(TungsteniteConnection {
            stream,
            pending_close: None,
            finished: false,
        }))
    }
}

/// One open tokio-tungstenite stream
pub struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Close reported on the call after a transport error
    pending_close: Option<CloseInfo>,
    finished: bool,
}

#[async_trait]
impl Connection for TungsteniteConnection {
    async fn send(&mut self, message: WsMessage) -> Result<()> {
        if self.finished {
            return Err(RealtimeError::ConnectionClosed("close handshake already started".into()));
        }

        self.stream
            .send(ws_message_to_tungstenite(message))
            .await
            .map_err(|e| RealtimeError::WebSocket(e.to_string()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        if let Some(info) = self.pending_close.take() {
            self.finished = true;
            return TransportEvent::Closed(info);
        }

        if self.finished {
            return std::future::pending().await;
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Frame(WsMessage::Text(text)),
                Some(Ok(Message::Binary(data))) => return TransportEvent::Frame(WsMessage::Binary(data)),
                Some(Ok(Message::Close(frame))) => {
                    self.finished = true;
                    let info = match frame {
                        Some(frame) => CloseInfo::from_code(u16::from(frame.code), frame.reason.to_string()),
                        None => CloseInfo::abnormal("closed without status code"),
                    };
                    return TransportEvent::Closed(info);
                }
                // Protocol-level ping/pong is answered by tungstenite itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    self.pending_close = Some(CloseInfo::abnormal(e.to_string()));
                    return TransportEvent::Error(e.to_string());
                }
                None => {
                    self.finished = true;
                    return TransportEvent::Closed(CloseInfo::abnormal("stream ended"));
                }
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_owned().into(),
        };

        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| RealtimeError::WebSocket(e.to_string()))
    }
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}
