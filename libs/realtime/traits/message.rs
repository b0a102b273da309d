//! Wire types exchanged over the realtime connection
//!
//! Every frame carries one JSON-encoded [`ChannelMessage`]:
//!
//! ```text
//! {"type": "market_update", "data": {...}, "timestamp": 1718000000000, "id": "k3j9x0a1b"}
//! ```

use crate::traits::error::{RealtimeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Well-known message type tags
pub mod kinds {
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const SUBSCRIBE: &str = "subscribe";
    pub const UNSUBSCRIBE: &str = "unsubscribe";

    pub const MARKET_UPDATE: &str = "market_update";
    pub const PRICE_UPDATE: &str = "price_update";
    pub const NFT_SOLD: &str = "nft_sold";

    pub const NEW_NOTIFICATION: &str = "new_notification";
    pub const NOTIFICATION_READ: &str = "notification_read";
    pub const NOTIFICATIONS_SYNC: &str = "notifications_sync";

    pub const NEW_TRADE: &str = "new_trade";
    pub const ORDERBOOK_UPDATE: &str = "orderbook_update";
    pub const ORDER_FILLED: &str = "order_filled";
    pub const ORDER_CANCELLED: &str = "order_cancelled";
}

/// Raw WebSocket payload, text or binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Text(_) => None,
            WsMessage::Binary(b) => Some(b),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }
}

/// Unit exchanged over the realtime connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Event kind tag, never empty
    #[serde(rename = "type")]
    pub kind: String,

    /// Payload, shape depends on `kind`
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,

    /// Producer-assigned send time (ms since epoch)
    #[serde(default)]
    pub timestamp: i64,

    /// Client-generated correlation id (outbound messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChannelMessage {
    pub fn new(kind: impl Into<String>, data: Value, timestamp: i64) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Heartbeat frame: `{"type": "ping", "timestamp": ...}`
    pub fn ping(timestamp: i64) -> Self {
        Self::new(kinds::PING, Value::Null, timestamp)
    }

    /// Payload for `subscribe` / `unsubscribe` control messages
    pub fn channel_payload(channel: &str) -> Value {
        json!({ "channel": channel })
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Decode an inbound frame
    ///
    /// Fails on invalid JSON, a missing `type`, or an empty `type`.
    pub fn parse(message: &WsMessage) -> Result<Self> {
        let parsed: ChannelMessage = match message {
            WsMessage::Text(text) => serde_json::from_str(text)?,
            WsMessage::Binary(bytes) => serde_json::from_slice(bytes)?,
        };

        if parsed.kind.trim().is_empty() {
            return Err(RealtimeError::Parse("message type is empty".into()));
        }

        Ok(parsed)
    }

    /// Encode as a text frame
    pub fn to_ws(&self) -> Result<WsMessage> {
        Ok(WsMessage::Text(serde_json::to_string(self)?))
    }
}
