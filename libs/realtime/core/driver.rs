//! Connection state machine
//!
//! One driver task owns the connection for its whole life. Everything that
//! can happen to it (a command from the owner or a consumer, a finished dial,
//! a transport event, a heartbeat tick, a reconnect timer) is turned into a
//! [`DriverEvent`] by [`Driver::next_event`] and handled in [`Driver::run`].
//!
//! ```text
//!            connect()                 dial ok
//!   Idle ────────────────> Dialing ──────────────> Connected
//!    ^  ^                   │  ^                     │  │
//!    │  │      dial failed  │  │ timer fired         │  │ clean close
//!    │  │                   v  │        unclean close│  │
//!    │  │              ReconnectPending <────────────┘  │
//!    │  │                   │ cap reached               │
//!    │  │                   v                           │
//!    │  └────────────── Exhausted                       │
//!    └──────────────────────────────────────────────────┘
//! ```
//!
//! Timers live inside the phase that needs them. [`Driver::enter`] replaces
//! the phase, which drops the previous one together with its heartbeat,
//! reconnect timer or in-flight dial.

use crate::client::{ChannelEvent, ChannelStatus};
use crate::config::ChannelConfig;
use crate::connection_state::{AtomicMetrics, ConnectionState};
use crate::heartbeat::{next_beat, Heartbeat};
use crate::traits::*;
use chrono::Utc;
use crossbeam_channel::Sender;
use futures::future::BoxFuture;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Sleep};
use tracing::{debug, error, info, warn};

/// Length of generated correlation ids
const ID_LEN: usize = 9;

/// Requests sent to the driver by the client and its handles
pub(crate) enum Command {
    Connect,
    Disconnect,
    Reconnect,
    Send { kind: String, data: Value },
    Subscribe(String),
    Unsubscribe(String),
    Listen(u64, Sender<ChannelEvent>),
    Unlisten(u64),
    Shutdown,
}

enum Phase {
    Idle,
    Dialing {
        dial: BoxFuture<'static, Result<Box<dyn Connection>>>,
    },
    Connected {
        connection: Box<dyn Connection>,
        heartbeat: Option<Heartbeat>,
    },
    ReconnectPending {
        timer: Pin<Box<Sleep>>,
    },
    Exhausted,
}

impl Phase {
    fn state(&self, attempts: usize) -> ConnectionState {
        match self {
            Phase::Idle | Phase::Exhausted => ConnectionState::Disconnected,
            Phase::Dialing { .. } if attempts == 0 => ConnectionState::Connecting,
            Phase::Dialing { .. } | Phase::ReconnectPending { .. } => ConnectionState::Reconnecting,
            Phase::Connected { .. } => ConnectionState::Connected,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Dialing { .. } => "dialing",
            Phase::Connected { .. } => "connected",
            Phase::ReconnectPending { .. } => "reconnect-pending",
            Phase::Exhausted => "exhausted",
        }
    }
}

enum DriverEvent {
    Command(Command),
    CommandsClosed,
    Dialed(Result<Box<dyn Connection>>),
    Transport(TransportEvent),
    HeartbeatDue,
    ReconnectDue,
}

impl From<Option<Command>> for DriverEvent {
    fn from(command: Option<Command>) -> Self {
        match command {
            Some(command) => DriverEvent::Command(command),
            None => DriverEvent::CommandsClosed,
        }
    }
}

/// Millisecond timestamps that never go backwards
#[derive(Debug, Default)]
struct MessageClock {
    last: i64,
}

impl MessageClock {
    fn now(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis().max(self.last);
        self.last = now;
        now
    }
}

/// Random alphanumeric correlation id
pub(crate) fn correlation_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

pub(crate) struct Driver {
    config: Arc<ChannelConfig>,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ChannelStatus>,
    metrics: Arc<AtomicMetrics>,
    listeners: Vec<(u64, Sender<ChannelEvent>)>,
    /// Channel name -> number of registrations
    channels: BTreeMap<String, usize>,
    phase: Phase,
    attempts: usize,
    clock: MessageClock,
}

impl Driver {
    pub(crate) fn new(
        config: Arc<ChannelConfig>,
        commands: mpsc::UnboundedReceiver<Command>,
        status: watch::Sender<ChannelStatus>,
        metrics: Arc<AtomicMetrics>,
    ) -> Self {
        Self {
            config,
            commands,
            status,
            metrics,
            listeners: Vec::new(),
            channels: BTreeMap::new(),
            phase: Phase::Idle,
            attempts: 0,
            clock: MessageClock::default(),
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            match self.next_event().await {
                DriverEvent::Command(Command::Shutdown) => {
                    debug!("Shutdown command received");
                    break;
                }
                DriverEvent::CommandsClosed => {
                    debug!("All channel handles dropped");
                    break;
                }
                DriverEvent::Command(command) => self.handle_command(command).await,
                DriverEvent::Dialed(Ok(connection)) => self.on_open(connection).await,
                DriverEvent::Dialed(Err(e)) => {
                    error!("Failed to connect to {}: {}", self.config.url, e);
                    let reason = e.to_string();
                    self.emit(ChannelEvent::Error(reason.clone()));
                    self.on_unclean_close(reason);
                }
                DriverEvent::Transport(TransportEvent::Frame(frame)) => self.on_frame(frame),
                DriverEvent::Transport(TransportEvent::Error(e)) => {
                    error!("WebSocket error: {}", e);
                    self.emit(ChannelEvent::Error(e));
                }
                DriverEvent::Transport(TransportEvent::Closed(info)) => self.on_closed(info),
                DriverEvent::HeartbeatDue => self.send_heartbeat().await,
                DriverEvent::ReconnectDue => {
                    info!("Reconnecting to {} (attempt {})", self.config.url, self.attempts);
                    self.dial();
                }
            }
        }

        self.close_connection("client shutdown").await;
        self.enter(Phase::Idle);
        info!("Channel driver exiting");
    }

    /// Wait for whatever the current phase can produce next
    ///
    /// Commands are always polled first so `disconnect()` wins over a timer
    /// that became ready in the same instant.
    async fn next_event(&mut self) -> DriverEvent {
        let commands = &mut self.commands;

        match &mut self.phase {
            Phase::Idle | Phase::Exhausted => commands.recv().await.into(),
            Phase::Dialing { dial } => tokio::select! {
                biased;
                command = commands.recv() => command.into(),
                result = dial.as_mut() => DriverEvent::Dialed(result),
            },
            Phase::Connected { connection, heartbeat } => tokio::select! {
                biased;
                command = commands.recv() => command.into(),
                event = connection.next_event() => DriverEvent::Transport(event),
                _ = next_beat(heartbeat) => DriverEvent::HeartbeatDue,
            },
            Phase::ReconnectPending { timer } => tokio::select! {
                biased;
                command = commands.recv() => command.into(),
                _ = timer.as_mut() => DriverEvent::ReconnectDue,
            },
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                if matches!(self.phase, Phase::Idle | Phase::Exhausted) {
                    self.reset_attempts();
                    self.dial();
                } else {
                    debug!("connect() ignored while {}", self.phase.name());
                }
            }
            Command::Disconnect => {
                info!("Disconnecting from {}", self.config.url);
                self.close_connection("client disconnect").await;
                self.enter(Phase::Idle);
            }
            Command::Reconnect => {
                info!("Forcing reconnect to {}", self.config.url);
                self.close_connection("client reconnect").await;
                self.enter(Phase::Idle);
                self.reset_attempts();
                self.dial();
            }
            Command::Send { kind, data } => {
                let message = ChannelMessage::new(kind, data, self.clock.now()).with_id(correlation_id());
                self.transmit(message).await;
            }
            Command::Subscribe(channel) => {
                let registrations = self.channels.entry(channel.clone()).or_insert(0);
                *registrations += 1;
                let first = *registrations == 1;

                if first && self.is_connected() {
                    self.send_control(kinds::SUBSCRIBE, &channel).await;
                }
            }
            Command::Unsubscribe(channel) => {
                let Some(registrations) = self.channels.get_mut(&channel) else {
                    debug!("unsubscribe for unknown channel '{}' ignored", channel);
                    return;
                };
                *registrations -= 1;

                if *registrations == 0 {
                    self.channels.remove(&channel);
                    if self.is_connected() {
                        self.send_control(kinds::UNSUBSCRIBE, &channel).await;
                    }
                }
            }
            Command::Listen(id, sender) => {
                // A listener joining an open connection starts from Opened
                if self.is_connected() && sender.send(ChannelEvent::Opened).is_err() {
                    return;
                }
                self.listeners.push((id, sender));
            }
            Command::Unlisten(id) => self.listeners.retain(|(listener, _)| *listener != id),
            // Handled by run()
            Command::Shutdown => {}
        }
    }

    /// Replace the current phase, dropping the previous one and its timers
    fn enter(&mut self, phase: Phase) {
        debug!("Phase {} -> {}", self.phase.name(), phase.name());
        self.phase = phase;

        let state = self.phase.state(self.attempts);
        self.status.send_if_modified(|status| {
            if status.state == state {
                return false;
            }
            status.state = state;
            true
        });
    }

    /// Single emission point: update the observable status, then fan out
    fn emit(&mut self, event: ChannelEvent) {
        self.status.send_modify(|status| match &event {
            ChannelEvent::Opened => {
                status.error = None;
                status.reconnect_attempts = 0;
            }
            ChannelEvent::Error(e) => status.error = Some(e.clone()),
            ChannelEvent::Message(message) => status.last_message = Some(message.clone()),
            ChannelEvent::Reconnecting { attempt, .. } => status.reconnect_attempts = *attempt,
            ChannelEvent::ReconnectExhausted { attempts, reason } => {
                let terminal = RealtimeError::ReconnectionFailed {
                    attempts: *attempts,
                    reason: reason.clone(),
                };
                status.error = Some(terminal.to_string());
            }
            ChannelEvent::Closed(_) => {}
        });

        // Listeners whose stream was dropped are removed here
        self.listeners.retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }

    fn reset_attempts(&mut self) {
        self.attempts = 0;
        self.status.send_modify(|status| {
            status.error = None;
            status.reconnect_attempts = 0;
        });
    }

    fn is_connected(&self) -> bool {
        matches!(self.phase, Phase::Connected { .. })
    }

    fn dial(&mut self) {
        let connector = Arc::clone(&self.config.connector);
        let headers = self.config.headers.clone();
        let url = self.config.url.clone();
        let protocols = self.config.protocols.clone();

        debug!("Dialing {}", url);

        let dial = Box::pin(async move {
            let headers = match headers {
                Some(provider) => provider.get_headers().await,
                None => Headers::new(),
            };
            connector
                .connect(ConnectRequest {
                    url,
                    protocols,
                    headers,
                })
                .await
        });

        self.enter(Phase::Dialing { dial });
    }

    async fn on_open(&mut self, connection: Box<dyn Connection>) {
        info!("Connected to {}", self.config.url);

        self.attempts = 0;
        let heartbeat = self.config.heartbeat_interval.and_then(Heartbeat::start);
        self.enter(Phase::Connected { connection, heartbeat });
        self.emit(ChannelEvent::Opened);

        let channels: Vec<String> = self.channels.keys().cloned().collect();
        for channel in channels {
            self.send_control(kinds::SUBSCRIBE, &channel).await;
        }
    }

    fn on_frame(&mut self, frame: WsMessage) {
        self.metrics.increment_received();

        match ChannelMessage::parse(&frame) {
            Ok(message) if message.is(kinds::PONG) => {
                debug!("Pong received");
                self.metrics.record_pong(self.clock.now());
            }
            Ok(message) => {
                debug!("Received {}", message.kind);
                self.emit(ChannelEvent::Message(message));
            }
            Err(e) => {
                self.metrics.increment_malformed();
                warn!("Dropping malformed frame: {}", e);
            }
        }
    }

    fn on_closed(&mut self, info: CloseInfo) {
        let clean = info.clean;
        let reason = info.reason.clone();

        if clean {
            info!("Connection closed cleanly: {}", reason);
        } else {
            warn!("Connection lost (code {:?}): {}", info.code, reason);
        }

        self.enter(Phase::Idle);
        self.emit(ChannelEvent::Closed(info));

        if !clean {
            self.on_unclean_close(reason);
        }
    }

    fn on_unclean_close(&mut self, reason: String) {
        match self.config.reconnect_strategy.next_delay(self.attempts) {
            Some(delay) => {
                self.attempts += 1;
                self.metrics.increment_reconnects();
                warn!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay,
                    self.attempts,
                    self.config
                        .reconnect_strategy
                        .max_attempts()
                        .map_or_else(|| "unlimited".to_string(), |max| max.to_string())
                );

                self.enter(Phase::ReconnectPending {
                    timer: Box::pin(sleep(delay)),
                });
                self.emit(ChannelEvent::Reconnecting {
                    attempt: self.attempts,
                    delay,
                });
            }
            None => self.exhaust(reason),
        }
    }

    fn exhaust(&mut self, reason: String) {
        let attempts = self.attempts;
        error!(
            "Reconnection exhausted after {} attempts to {}: {}",
            attempts, self.config.url, reason
        );

        self.enter(Phase::Exhausted);
        self.emit(ChannelEvent::ReconnectExhausted { attempts, reason });

        if let Some(queue) = &self.config.notifier {
            queue.error(
                "Connection lost",
                Some(format!(
                    "Unable to reach the realtime service after {} attempts. Reconnect to try again.",
                    attempts
                )),
                None,
            );
        }
    }

    async fn send_heartbeat(&mut self) {
        let ping = ChannelMessage::ping(self.clock.now());
        if self.transmit(ping).await {
            self.metrics.increment_heartbeats();
            debug!("Heartbeat sent");
        }
    }

    async fn send_control(&mut self, kind: &str, channel: &str) {
        let message = ChannelMessage::new(kind, ChannelMessage::channel_payload(channel), self.clock.now())
            .with_id(correlation_id());
        if self.transmit(message).await {
            debug!("Sent {} for channel '{}'", kind, channel);
        }
    }

    /// Send on the open connection, or drop with a warning
    async fn transmit(&mut self, message: ChannelMessage) -> bool {
        let Phase::Connected { connection, .. } = &mut self.phase else {
            warn!("Dropping outbound '{}': connection is not open", message.kind);
            self.metrics.increment_dropped();
            return false;
        };

        let result = match message.to_ws() {
            Ok(frame) => connection.send(frame).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.metrics.increment_sent();
                true
            }
            Err(e) => {
                error!("Failed to send '{}': {}", message.kind, e);
                self.emit(ChannelEvent::Error(e.to_string()));
                false
            }
        }
    }

    /// Close the open connection (if any) with a normal-closure code
    ///
    /// The connection object is dropped right after, so no late close event
    /// from it can reach the state machine.
    async fn close_connection(&mut self, reason: &str) {
        let Phase::Connected { connection, .. } = &mut self.phase else {
            return;
        };

        if let Err(e) = connection.close(NORMAL_CLOSURE, reason).await {
            debug!("Close handshake failed: {}", e);
        }

        self.enter(Phase::Idle);
        self.emit(ChannelEvent::Closed(CloseInfo::normal(reason)));
    }
}
