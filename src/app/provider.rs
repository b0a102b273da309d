//! Outermost owner of the dashboard's shared resources
//!
//! The provider creates the toast queue, the single realtime connection, the
//! REST client and the three channel feeds. Feature code only ever receives
//! handles; the connection is torn down once, in [`DashboardProvider::shutdown`].

use crate::app::config::DashboardConfig;
use anyhow::{Context, Result};
use api_client::{ApiClient, BearerHeaders, MemoryTokenStore, TokenStore};
use realtime::feeds::{spawn_feed, FeedHandle, MarketplaceFeed, NotificationsFeed, TradingFeed};
use realtime::{ChannelClient, ChannelHandle, ChannelStatus, Connector, TungsteniteConnector};
use std::fmt;
use std::sync::Arc;
use toasts::{ToastProvider, ToastQueue};
use tracing::{info, warn};

/// The three channel feeds the dashboard renders
pub struct DashboardFeeds {
    pub marketplace: FeedHandle<MarketplaceFeed>,
    pub notifications: FeedHandle<NotificationsFeed>,
    pub trading: FeedHandle<TradingFeed>,
}

impl DashboardFeeds {
    fn spawn(handle: &ChannelHandle, alerts: Option<ToastQueue>) -> Self {
        let (notifications, trading) = match alerts {
            Some(queue) => (
                NotificationsFeed::with_toasts(queue.clone()),
                TradingFeed::with_toasts(queue),
            ),
            None => (NotificationsFeed::new(), TradingFeed::new()),
        };

        Self {
            marketplace: spawn_feed(handle, MarketplaceFeed::new()),
            notifications: spawn_feed(handle, notifications),
            trading: spawn_feed(handle, trading),
        }
    }

    fn stop(self) {
        self.marketplace.stop();
        self.notifications.stop();
        self.trading.stop();
    }

    /// Stop every feed on the blocking pool; joining the feed threads must
    /// not stall the runtime workers
    async fn shutdown(self) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.stop()).await {
            warn!("Feed shutdown task failed: {}", e);
        }
    }
}

/// Point-in-time view of everything the provider owns
#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub status: ChannelStatus,
    pub listings: usize,
    pub unread_notifications: usize,
    pub trades: usize,
    pub open_orders: usize,
    pub toasts: usize,
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | listings: {} | unread: {} | trades: {} | open orders: {} | toasts: {}",
            self.status.state,
            self.listings,
            self.unread_notifications,
            self.trades,
            self.open_orders,
            self.toasts
        )?;
        if let Some(error) = &self.status.error {
            write!(f, " | error: {}", error)?;
        }
        Ok(())
    }
}

pub struct DashboardProvider {
    feeds: Option<DashboardFeeds>,
    client: Option<ChannelClient>,
    handle: ChannelHandle,
    api: Arc<ApiClient>,
    tokens: Arc<dyn TokenStore>,
    toasts: ToastProvider,
}

impl DashboardProvider {
    /// Start everything against the real WebSocket transport and connect
    pub async fn start(config: &DashboardConfig) -> Result<Self> {
        Self::launch(config, None::<TungsteniteConnector>).await
    }

    /// Start with a custom transport
    pub async fn start_with_connector(
        config: &DashboardConfig,
        connector: impl Connector + 'static,
    ) -> Result<Self> {
        Self::launch(config, Some(connector)).await
    }

    async fn launch<C: Connector + 'static>(config: &DashboardConfig, connector: Option<C>) -> Result<Self> {
        config.validate()?;

        let toasts = ToastProvider::current();
        let queue = toasts.queue();

        let tokens: Arc<dyn TokenStore> = match &config.api.token {
            Some(token) => Arc::new(MemoryTokenStore::with_token(token.clone())),
            None => Arc::new(MemoryTokenStore::new()),
        };

        let mut api = ApiClient::new(config.api.base_url.clone())
            .context("Failed to create API client")?
            .with_tokens(Arc::clone(&tokens));
        if config.toasts.request_alerts {
            api = api.with_toasts(queue.clone());
        }

        let mut builder = realtime::builder()
            .settings(&config.realtime)
            .headers(BearerHeaders::new(Arc::clone(&tokens)));
        if let Some(connector) = connector {
            builder = builder.connector(connector);
        }
        if config.toasts.connection_alerts {
            builder = builder.notifier(queue.clone());
        }

        let client = builder.build().await.context("Failed to create realtime client")?;
        let handle = client.handle();

        let feed_alerts = config.toasts.feed_alerts.then(|| queue.clone());
        let feeds = DashboardFeeds::spawn(&handle, feed_alerts);

        client.connect();
        info!("Dashboard provider started ({})", config.realtime.url);

        Ok(Self {
            feeds: Some(feeds),
            client: Some(client),
            handle,
            api: Arc::new(api),
            tokens,
            toasts,
        })
    }

    /// Consumer handle on the shared connection
    pub fn channel(&self) -> ChannelHandle {
        self.handle.clone()
    }

    pub fn toasts(&self) -> ToastQueue {
        self.toasts.queue()
    }

    pub fn api(&self) -> Arc<ApiClient> {
        Arc::clone(&self.api)
    }

    pub fn tokens(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.tokens)
    }

    pub fn feeds(&self) -> Option<&DashboardFeeds> {
        self.feeds.as_ref()
    }

    /// Drop the current socket and dial again, resetting the attempt budget
    pub fn reconnect(&self) {
        if let Some(client) = &self.client {
            client.reconnect();
        }
    }

    pub fn summary(&self) -> DashboardSummary {
        let mut summary = DashboardSummary {
            status: self.handle.status(),
            listings: 0,
            unread_notifications: 0,
            trades: 0,
            open_orders: 0,
            toasts: self.toasts.queue().len(),
        };

        if let Some(feeds) = &self.feeds {
            summary.listings = feeds.marketplace.read().len();
            summary.unread_notifications = feeds.notifications.read().unread_count();

            let trading = feeds.trading.read();
            summary.trades = trading.trade_count();
            summary.open_orders = trading.open_orders().len();
        }

        summary
    }

    /// Stop the feeds, then the connection, then the toast timers
    pub async fn shutdown(mut self) {
        if let Some(feeds) = self.feeds.take() {
            feeds.shutdown().await;
        }

        if let Some(client) = self.client.take() {
            client.shutdown().await;
        }

        info!("Dashboard provider stopped");
    }
}
