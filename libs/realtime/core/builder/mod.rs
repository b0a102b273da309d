pub mod states;

use crate::client::ChannelClient;
use crate::config::{
    ChannelConfig, RealtimeSettings, DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_INTERVAL_MS,
};
use crate::traits::*;
use crate::tungstenite::TungsteniteConnector;
use states::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use toasts::ToastQueue;

/// Type-state builder for [`ChannelClient`]
///
/// The endpoint URL is required before `build()` becomes available.
/// Everything else falls back to the realtime defaults: a fixed 3000 ms
/// reconnect interval, 5 attempts and a 30 s heartbeat.
pub struct ChannelClientBuilder<U: UrlState> {
    _state: PhantomData<U>,
    url: Option<String>,
    protocols: Vec<String>,
    reconnect_interval: Duration,
    max_reconnect_attempts: Option<usize>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    heartbeat_interval: Duration,
    connector: Option<Arc<dyn Connector>>,
    headers: Option<Arc<dyn HeaderProvider>>,
    notifier: Option<ToastQueue>,
}

impl ChannelClientBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: PhantomData,
            url: None,
            protocols: Vec::new(),
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
            max_reconnect_attempts: Some(DEFAULT_MAX_RECONNECT_ATTEMPTS),
            reconnect_strategy: None,
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            connector: None,
            headers: None,
            notifier: None,
        }
    }

    pub fn url(self, url: impl Into<String>) -> ChannelClientBuilder<HasUrl> {
        ChannelClientBuilder {
            _state: PhantomData,
            url: Some(url.into()),
            protocols: self.protocols,
            reconnect_interval: self.reconnect_interval,
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_strategy: self.reconnect_strategy,
            heartbeat_interval: self.heartbeat_interval,
            connector: self.connector,
            headers: self.headers,
            notifier: self.notifier,
        }
    }

    /// Take URL, sub-protocols and timings from loaded settings
    pub fn settings(self, settings: &RealtimeSettings) -> ChannelClientBuilder<HasUrl> {
        self.url(settings.url.clone())
            .protocols(settings.protocols.clone())
            .reconnect_interval(settings.reconnect_interval())
            .max_reconnect_attempts(settings.max_reconnect_attempts)
            .heartbeat_interval(settings.heartbeat_interval().unwrap_or(Duration::ZERO))
    }
}

impl Default for ChannelClientBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U: UrlState> ChannelClientBuilder<U> {
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    pub fn protocols(mut self, protocols: Vec<String>) -> Self {
        self.protocols.extend(protocols);
        self
    }

    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn max_reconnect_attempts(mut self, attempts: usize) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Retry forever
    pub fn unlimited_reconnects(mut self) -> Self {
        self.max_reconnect_attempts = None;
        self
    }

    /// Replace the fixed-interval policy entirely
    ///
    /// Overrides `reconnect_interval` and `max_reconnect_attempts`.
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Ping period while connected; `Duration::ZERO` disables the heartbeat
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Transport factory (defaults to tokio-tungstenite)
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    pub fn headers(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.headers = Some(Arc::new(provider));
        self
    }

    /// Queue that receives the user-facing toast when reconnects run out
    pub fn notifier(mut self, queue: ToastQueue) -> Self {
        self.notifier = Some(queue);
        self
    }
}

// Build method - only available once the URL is set
impl ChannelClientBuilder<HasUrl> {
    /// Validate the configuration and spawn the client's driver task
    ///
    /// The client starts idle; call [`ChannelClient::connect`] to dial.
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> Result<ChannelClient> {
        let url = self
            .url
            .ok_or_else(|| RealtimeError::Configuration("URL must be set".into()))?;

        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(RealtimeError::Configuration(format!(
                "realtime URL must start with ws:// or wss://, got '{}'",
                url
            )));
        }

        let reconnect_strategy = self.reconnect_strategy.unwrap_or_else(|| {
            Box::new(FixedDelay::new(
                self.reconnect_interval,
                self.max_reconnect_attempts,
            ))
        });

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(TungsteniteConnector::new()));

        let config = ChannelConfig {
            url,
            protocols: self.protocols,
            reconnect_strategy,
            heartbeat_interval: (!self.heartbeat_interval.is_zero()).then_some(self.heartbeat_interval),
            connector,
            headers: self.headers,
            notifier: self.notifier,
        };

        Ok(ChannelClient::spawn(config))
    }
}
