//! Derived channel feeds
//!
//! Each feed is a pure reducer over the messages of one channel. None of
//! them owns a socket: [`spawn_feed`] subscribes the feed's channel on the
//! shared client and drives the reducer from the client's event stream.

pub mod marketplace;
pub mod notifications;
pub mod runner;
pub mod trading;

pub use marketplace::MarketplaceFeed;
pub use notifications::{Notification, NotificationsFeed};
pub use runner::{spawn_feed, FeedHandle};
pub use trading::{OpenOrder, OrderBook, PriceLevel, Trade, TradingFeed};

use crate::traits::ChannelMessage;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Channel carrying listing and price events
pub const MARKETPLACE_CHANNEL: &str = "marketplace";

/// Channel carrying the user's notifications
pub const NOTIFICATIONS_CHANNEL: &str = "notifications";

/// Channel carrying trades, the order book and order lifecycle events
pub const TRADING_CHANNEL: &str = "trading";

/// Decode a message payload, logging and skipping payloads of the wrong shape
pub(crate) fn decode<T: DeserializeOwned>(message: &ChannelMessage) -> Option<T> {
    match serde_json::from_value(message.data.clone()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!("Ignoring '{}' with unexpected payload: {}", message.kind, e);
            None
        }
    }
}

/// String key for an identifier sent either as a string or a number
pub(crate) fn key_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
