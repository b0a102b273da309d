use crate::traits::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use toasts::ToastQueue;

/// Delay between reconnect attempts when none is configured (ms)
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 3000;

/// Attempt cap when none is configured
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: usize = 5;

/// Heartbeat period when none is configured (ms)
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Configuration for a channel client
///
/// Built by [`ChannelClientBuilder`](crate::core::builder::ChannelClientBuilder)
/// and shared read-only with the driver task.
pub struct ChannelConfig {
    /// Endpoint address (ws:// or wss://)
    pub(crate) url: String,

    /// Requested WebSocket sub-protocols
    pub(crate) protocols: Vec<String>,

    /// Retry policy after unclean closes
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,

    /// Ping period; `None` disables the heartbeat
    pub(crate) heartbeat_interval: Option<Duration>,

    /// Transport factory
    pub(crate) connector: Arc<dyn Connector>,

    /// Optional handshake headers, fetched before every dial
    pub(crate) headers: Option<Arc<dyn HeaderProvider>>,

    /// Queue that receives the escalation toast on reconnect exhaustion
    pub(crate) notifier: Option<ToastQueue>,
}

impl ChannelConfig {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval
    }

    pub fn max_reconnect_attempts(&self) -> Option<usize> {
        self.reconnect_strategy.max_attempts()
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }
}

/// File/environment representation of the realtime settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeSettings {
    pub url: String,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: usize,
    /// 0 disables the heartbeat
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

impl RealtimeSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            protocols: Vec::new(),
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
        }
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }
}

fn default_reconnect_interval_ms() -> u64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

fn default_max_reconnect_attempts() -> usize {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}
