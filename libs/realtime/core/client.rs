use crate::config::ChannelConfig;
use crate::connection_state::{AtomicMetrics, ConnectionState, Metrics};
use crate::driver::{Command, Driver};
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, TryRecvError};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Lifecycle and data events fanned out to every listener
///
/// All listeners observe the same sequence in the same order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Connection established
    Opened,
    /// Connection closed (clean or not)
    Closed(CloseInfo),
    /// Transport or dial error; retry policy continues
    Error(String),
    /// Inbound message (never a `pong`, never malformed)
    Message(ChannelMessage),
    /// Retry scheduled after an unclean close
    Reconnecting { attempt: usize, delay: Duration },
    /// Retry cap reached; nothing happens until `connect()` or `reconnect()`
    ReconnectExhausted { attempts: usize, reason: String },
}

/// Observable client status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// Last transport error or the terminal exhaustion message
    pub error: Option<String>,
    /// Most recently received message, `None` before the first one
    pub last_message: Option<ChannelMessage>,
    /// Reconnect attempts made since the last successful open
    pub reconnect_attempts: usize,
}

impl ChannelStatus {
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.state.is_connecting()
    }
}

/// Owner of the shared realtime connection
///
/// Only the owner controls the connection lifecycle. Feature consumers get a
/// [`ChannelHandle`] which can send, subscribe and observe but never close
/// the connection.
///
/// Dropping the client stops the driver task and closes the connection.
pub struct ChannelClient {
    handle: ChannelHandle,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ChannelClient {
    /// Spawn the driver task for `config`
    ///
    /// Called by the builder's `build()`. Use `realtime::builder()` to create
    /// a client.
    pub(crate) fn spawn(config: ChannelConfig) -> Self {
        let config = Arc::new(config);
        let metrics = Arc::new(AtomicMetrics::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ChannelStatus::default());

        let driver = Driver::new(Arc::clone(&config), command_rx, status_tx, Arc::clone(&metrics));
        let task = tokio::spawn(driver.run());

        debug!("Channel client created for {}", config.url());

        Self {
            handle: ChannelHandle {
                commands: command_tx,
                status: status_rx,
                metrics,
                next_listener: Arc::new(AtomicU64::new(0)),
            },
            task: Some(task),
        }
    }

    /// Open the connection; no-op while connecting, connected or waiting to retry
    pub fn connect(&self) {
        self.handle.command(Command::Connect);
    }

    /// Close with a normal-closure code and cancel every pending timer
    ///
    /// Never triggers the reconnect policy.
    pub fn disconnect(&self) {
        self.handle.command(Command::Disconnect);
    }

    /// Disconnect, reset the attempt counter and connect again
    pub fn reconnect(&self) {
        self.handle.command(Command::Reconnect);
    }

    /// Cloneable consumer handle
    pub fn handle(&self) -> ChannelHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> ChannelStatus {
        self.handle.status()
    }

    pub fn metrics(&self) -> Metrics {
        self.handle.metrics()
    }

    /// Stop the driver and wait for it to finish
    pub async fn shutdown(mut self) {
        info!("Shutting down channel client");
        self.handle.command(Command::Shutdown);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Channel driver ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        if self.task.take().is_some() {
            self.handle.command(Command::Shutdown);
        }
    }
}

/// Narrow consumer surface of the shared connection
#[derive(Clone)]
pub struct ChannelHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ChannelStatus>,
    metrics: Arc<AtomicMetrics>,
    next_listener: Arc<AtomicU64>,
}

impl ChannelHandle {
    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Channel driver has stopped, command ignored");
        }
    }

    /// Send a typed message
    ///
    /// The message gets a timestamp and a fresh correlation id. If the
    /// connection is not open the message is dropped with a warning.
    pub fn send_message(&self, kind: impl Into<String>, data: Value) {
        self.command(Command::Send {
            kind: kind.into(),
            data,
        });
    }

    /// Register interest in a channel
    ///
    /// Channel names are reference counted. The first registration sends
    /// `subscribe` (immediately if connected), and every reconnect re-sends it.
    pub fn subscribe_channel(&self, channel: impl Into<String>) {
        self.command(Command::Subscribe(channel.into()));
    }

    /// Drop one registration; the last one sends `unsubscribe`
    ///
    /// Never closes the shared connection.
    pub fn unsubscribe_channel(&self, channel: impl Into<String>) {
        self.command(Command::Unsubscribe(channel.into()));
    }

    /// Start receiving [`ChannelEvent`]s
    ///
    /// Only events emitted after the driver registers the listener are
    /// delivered, except that a listener registered while connected first
    /// receives [`ChannelEvent::Opened`]. Dropping the stream deregisters it.
    pub fn listen(&self) -> EventStream {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();
        self.command(Command::Listen(id, tx));

        EventStream {
            id,
            events: rx,
            commands: self.commands.clone(),
        }
    }

    pub fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    /// Wait until the status satisfies `predicate`
    ///
    /// Returns `None` if the driver stops first.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&ChannelStatus) -> bool,
    ) -> Option<ChannelStatus> {
        let mut status = self.status.clone();
        let result = status
            .wait_for(|current| predicate(current))
            .await
            .ok()
            .map(|current| ChannelStatus::clone(&current));
        result
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.status.borrow().is_connecting()
    }

    pub fn error(&self) -> Option<String> {
        self.status.borrow().error.clone()
    }

    pub fn last_message(&self) -> Option<ChannelMessage> {
        self.status.borrow().last_message.clone()
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// True once the driver task has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("status", &*self.status.borrow())
            .finish()
    }
}

/// Listener registration returned by [`ChannelHandle::listen`]
///
/// Blocking receive methods are meant for feed threads, not async tasks.
pub struct EventStream {
    id: u64,
    events: Receiver<ChannelEvent>,
    commands: mpsc::UnboundedSender<Command>,
}

impl EventStream {
    /// Block until the next event; `None` once the driver has stopped
    pub fn recv(&self) -> Option<ChannelEvent> {
        self.events.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<ChannelEvent, RecvTimeoutError> {
        self.events.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> std::result::Result<ChannelEvent, TryRecvError> {
        self.events.try_recv()
    }

    /// Take every event already queued
    pub fn drain(&self) -> Vec<ChannelEvent> {
        self.events.try_iter().collect()
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Unlisten(self.id));
    }
}
