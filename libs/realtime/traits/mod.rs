//! # Realtime Traits
//!
//! Core traits and wire types for the realtime channel client:
//!
//! - **ChannelMessage / WsMessage**: what travels over the connection
//! - **Connector / Connection**: the transport seam
//! - **ReconnectionStrategy**: when and how often to retry
//! - **HeaderProvider**: handshake headers, refreshed on every dial
//! - **ChannelFeed**: reducers that derive state from one channel

pub mod error;
pub mod feed;
pub mod headers;
pub mod message;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{RealtimeError, Result};
pub use feed::ChannelFeed;
pub use headers::{HeaderProvider, Headers, StaticHeaders};
pub use message::{kinds, ChannelMessage, WsMessage};
pub use reconnect::{FixedDelay, ReconnectionStrategy};
pub use transport::{CloseInfo, ConnectRequest, Connection, Connector, TransportEvent, NORMAL_CLOSURE};
