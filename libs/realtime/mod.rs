//! # Realtime
//!
//! A single shared WebSocket connection with reconnect, heartbeat and
//! per-channel derived state.
//!
//! ## Features
//!
//! - **One owner, many consumers**: the provider owns the connection, feature
//!   code gets a narrow [`ChannelHandle`]
//! - **Phase-owned timers**: heartbeat and reconnect timers cannot outlive
//!   the phase that started them
//! - **Fixed-interval retry** with an attempt cap and a user-visible toast on
//!   exhaustion
//! - **Channel feeds**: marketplace, notifications and trading reducers fed
//!   in arrival order on dedicated threads
//!
//! ## Example
//!
//! ```rust,ignore
//! use realtime::feeds::{spawn_feed, MarketplaceFeed};
//!
//! let client = realtime::builder()
//!     .url("wss://rt.example.com/ws")
//!     .build()
//!     .await?;
//! client.connect();
//!
//! let market = spawn_feed(&client.handle(), MarketplaceFeed::default());
//! println!("{} listings", market.read().len());
//! ```

pub mod traits;
pub mod core;
pub mod feeds;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    builder, client, config, connection_state, heartbeat, tungstenite,
    builder::{states, ChannelClientBuilder},
    client::{ChannelClient, ChannelEvent, ChannelHandle, ChannelStatus, EventStream},
    config::{ChannelConfig, RealtimeSettings},
    connection_state::{AtomicMetrics, ConnectionState, Metrics},
    tungstenite::TungsteniteConnector,
};
pub(crate) use core::driver;
