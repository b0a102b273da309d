//! Channel client core
//!
//! - **builder**: type-state construction of a [`ChannelClient`]
//! - **client**: owner/consumer API, events and observable status
//! - **driver**: the single task that owns the connection state machine
//! - **heartbeat**: ping schedule owned by the connected phase
//! - **tungstenite**: production WebSocket transport

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub(crate) mod driver;
pub mod heartbeat;
pub mod tungstenite;

// Re-export main types
pub use builder::{states, ChannelClientBuilder};
pub use client::{ChannelClient, ChannelEvent, ChannelHandle, ChannelStatus, EventStream};
pub use config::{ChannelConfig, RealtimeSettings};
pub use connection_state::{AtomicMetrics, ConnectionState, Metrics};
pub use heartbeat::Heartbeat;
pub use tungstenite::{TungsteniteConnection, TungsteniteConnector};

/// Create a new channel client builder
///
/// # Example
/// ```ignore
/// let client = realtime::builder()
///     .url("wss://rt.example.com/ws")
///     .reconnect_interval(Duration::from_millis(3000))
///     .max_reconnect_attempts(5)
///     .notifier(toasts.queue())
///     .build()
///     .await?;
///
/// client.connect();
/// ```
pub fn builder() -> ChannelClientBuilder<states::NoUrl> {
    ChannelClientBuilder::new()
}
