use super::{decode, key_of, MARKETPLACE_CHANNEL};
use crate::traits::{kinds, ChannelFeed, ChannelMessage};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Listing object as sent by the marketplace (opaque apart from its `id`)
pub type Listing = Map<String, Value>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceUpdate {
    token_id: Value,
    price: f64,
}

/// Live marketplace listings and token prices
#[derive(Debug, Default)]
pub struct MarketplaceFeed {
    /// Listings in first-seen order
    listings: Vec<Listing>,
    /// Token id -> last known price
    prices: HashMap<String, f64>,
    live: bool,
    last_update: Option<i64>,
}

impl MarketplaceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn listing(&self, id: &str) -> Option<&Listing> {
        self.position(id).map(|index| &self.listings[index])
    }

    pub fn price(&self, token_id: &str) -> Option<f64> {
        self.prices.get(token_id).copied()
    }

    pub fn prices(&self) -> &HashMap<String, f64> {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// False while the connection is down; data may be stale
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Timestamp of the last applied update
    pub fn last_update(&self) -> Option<i64> {
        self.last_update
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.listings
            .iter()
            .position(|listing| listing.get("id").and_then(key_of).as_deref() == Some(id))
    }

    /// Shallow-merge `update` into the listing with the same id, or append it.
    /// Returns false when the update carries no id.
    fn merge_listing(&mut self, update: Listing) -> bool {
        let Some(id) = update.get("id").and_then(key_of) else {
            debug!("market_update without id ignored");
            return false;
        };

        match self.position(&id) {
            Some(index) => self.listings[index].extend(update),
            None => self.listings.push(update),
        }
        true
    }

    fn remove_sold(&mut self, data: &Value) -> bool {
        let Some(id) = data.get("id").or_else(|| data.get("tokenId")).and_then(key_of) else {
            debug!("nft_sold without id ignored");
            return false;
        };

        self.listings.retain(|listing| {
            let matches = |field: &str| listing.get(field).and_then(key_of).as_deref() == Some(id.as_str());
            !(matches("id") || matches("tokenId"))
        });
        self.prices.remove(&id);
        true
    }
}

impl ChannelFeed for MarketplaceFeed {
    fn channel(&self) -> &'static str {
        MARKETPLACE_CHANNEL
    }

    fn apply(&mut self, message: &ChannelMessage) {
        let applied = match message.kind.as_str() {
            kinds::MARKET_UPDATE => match decode::<Listing>(message) {
                Some(update) => self.merge_listing(update),
                None => false,
            },
            kinds::PRICE_UPDATE => {
                let Some(update) = decode::<PriceUpdate>(message) else {
                    return;
                };
                match key_of(&update.token_id) {
                    Some(token_id) => {
                        self.prices.insert(token_id, update.price);
                        true
                    }
                    None => {
                        debug!("price_update without tokenId ignored");
                        false
                    }
                }
            }
            kinds::NFT_SOLD => self.remove_sold(&message.data),
            other => {
                debug!("Marketplace feed ignoring '{}'", other);
                false
            }
        };

        if applied {
            self.last_update = Some(message.timestamp);
        }
    }

    fn on_connection_change(&mut self, connected: bool) {
        self.live = connected;
    }
}
