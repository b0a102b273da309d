use super::{decode, TRADING_CHANNEL};
use crate::traits::{kinds, ChannelFeed, ChannelMessage};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use toasts::ToastQueue;
use tracing::debug;

/// Trades kept in the ledger, newest first
pub const TRADE_LEDGER_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    #[serde(default)]
    pub token_id: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.iter().map(|level| level.price).reduce(f64::max)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.iter().map(|level| level.price).reduce(f64::min)
    }

    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()? - self.best_bid()?)
    }
}

/// Order placed by this user that has not been filled or cancelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub id: String,
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderRef {
    order_id: String,
}

/// Trade ledger, order book and the user's open orders
#[derive(Debug, Default)]
pub struct TradingFeed {
    trades: VecDeque<Trade>,
    book: OrderBook,
    open_orders: Vec<OpenOrder>,
    toasts: Option<ToastQueue>,
    live: bool,
}

impl TradingFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_toasts(queue: ToastQueue) -> Self {
        Self {
            toasts: Some(queue),
            ..Self::default()
        }
    }

    /// Remember an order placed through the REST API so fills can be matched
    pub fn track_order(&mut self, order: OpenOrder) {
        if !self.open_orders.iter().any(|o| o.id == order.id) {
            self.open_orders.push(order);
        }
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    pub fn latest_trade(&self) -> Option<&Trade> {
        self.trades.front()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn order_book(&self) -> &OrderBook {
        &self.book
    }

    pub fn open_orders(&self) -> &[OpenOrder] {
        &self.open_orders
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    fn record_trade(&mut self, trade: Trade) {
        self.trades.push_front(trade);
        self.trades.truncate(TRADE_LEDGER_CAPACITY);
    }

    fn remove_order(&mut self, order_id: &str) -> Option<OpenOrder> {
        let index = self.open_orders.iter().position(|o| o.id == order_id)?;
        Some(self.open_orders.remove(index))
    }
}

impl ChannelFeed for TradingFeed {
    fn channel(&self) -> &'static str {
        TRADING_CHANNEL
    }

    fn apply(&mut self, message: &ChannelMessage) {
        match message.kind.as_str() {
            kinds::NEW_TRADE => {
                if let Some(trade) = decode(message) {
                    self.record_trade(trade);
                }
            }
            kinds::ORDERBOOK_UPDATE => {
                if let Some(book) = decode(message) {
                    self.book = book;
                }
            }
            kinds::ORDER_FILLED => {
                let Some(OrderRef { order_id }) = decode(message) else {
                    return;
                };
                if self.remove_order(&order_id).is_none() {
                    debug!("order_filled for untracked order '{}'", order_id);
                }
                if let Some(queue) = &self.toasts {
                    queue.success("Order filled", Some(format!("Order {} was filled", order_id)));
                }
            }
            kinds::ORDER_CANCELLED => {
                if let Some(OrderRef { order_id }) = decode(message) {
                    self.remove_order(&order_id);
                }
            }
            other => debug!("Trading feed ignoring '{}'", other),
        }
    }

    fn on_connection_change(&mut self, connected: bool) {
        self.live = connected;
    }
}
