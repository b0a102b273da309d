//! Transport seam
//!
//! The channel driver never touches a socket directly. It asks a
//! [`Connector`] for a [`Connection`] and then only sends frames and waits
//! for [`TransportEvent`]s. Production uses the tokio-tungstenite connector;
//! tests plug in an in-memory one.

use crate::traits::error::Result;
use crate::traits::headers::Headers;
use crate::traits::message::WsMessage;
use async_trait::async_trait;

/// WebSocket close code for a normal, intentional closure
pub const NORMAL_CLOSURE: u16 = 1000;

/// Details of a closed connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: Option<u16>,
    pub reason: String,
    /// True only for a completed close handshake with [`NORMAL_CLOSURE`]
    pub clean: bool,
}

impl CloseInfo {
    /// Normal closure (code 1000)
    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            code: Some(NORMAL_CLOSURE),
            reason: reason.into(),
            clean: true,
        }
    }

    /// Connection lost without a normal close handshake
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: None,
            reason: reason.into(),
            clean: false,
        }
    }

    /// Close frame received from the peer
    pub fn from_code(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
            clean: code == NORMAL_CLOSURE,
        }
    }
}

/// Event produced by an open connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Data frame received
    Frame(WsMessage),
    /// Non-fatal transport error
    Error(String),
    /// Connection finished; no further events follow
    Closed(CloseInfo),
}

/// Everything needed to open one connection
#[derive(Debug, Clone, Default)]
pub struct ConnectRequest {
    pub url: String,
    pub protocols: Vec<String>,
    pub headers: Headers,
}

/// An open, bidirectional connection
#[async_trait]
pub trait Connection: Send {
    /// Transmit one frame
    async fn send(&mut self, message: WsMessage) -> Result<()>;

    /// Wait for the next inbound event
    ///
    /// Must be cancel-safe: the driver races it against commands and timers.
    async fn next_event(&mut self) -> TransportEvent;

    /// Start a close handshake with the given code
    async fn close(&mut self, code: u16, reason: &str) -> Result<()>;
}

/// Factory for connections
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, request: ConnectRequest) -> Result<Box<dyn Connection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_info_cleanliness() {
        assert!(CloseInfo::normal("bye").clean);
        assert!(!CloseInfo::abnormal("reset").clean);
        assert!(CloseInfo::from_code(1000, "").clean);
        assert!(!CloseInfo::from_code(1001, "going away").clean);
        assert!(!CloseInfo::from_code(1006, "").clean);
    }
}
