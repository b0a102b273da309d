//! Heartbeat timer for an open connection
//!
//! # Architecture
//!
//! The heartbeat is not a separate task. It is an interval owned by the
//! driver's `Connected` phase:
//!
//! ```text
//! Phase::Connected { connection, heartbeat: Some(Heartbeat) }
//!                                      │
//!           driver select! ── tick ────┘──> send {"type":"ping","timestamp":...}
//! ```
//!
//! Leaving the phase drops the interval, so a stale heartbeat can never
//! fire after a disconnect and two heartbeats can never run at once.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Periodic ping schedule for one connection
#[derive(Debug)]
pub struct Heartbeat {
    ticker: Interval,
    period: Duration,
}

impl Heartbeat {
    /// Start a heartbeat whose first tick is one full period from now
    ///
    /// Returns `None` for a zero period (heartbeat disabled).
    pub fn start(period: Duration) -> Option<Self> {
        if period.is_zero() {
            return None;
        }

        let mut ticker = interval_at(Instant::now() + period, period);
        // If we miss ticks due to slow processing, skip them rather than bursting
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Some(Self { ticker, period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next tick
    pub async fn tick(&mut self) {
        self.ticker.tick().await;
    }
}

/// Wait for the next tick of an optional heartbeat; pends forever if disabled
pub(crate) async fn next_beat(heartbeat: &mut Option<Heartbeat>) {
    match heartbeat {
        Some(heartbeat) => heartbeat.tick().await,
        None => std::future::pending().await,
    }
}
