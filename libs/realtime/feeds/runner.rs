use crate::client::{ChannelEvent, ChannelHandle};
use crate::traits::ChannelFeed;
use crossbeam_channel::RecvTimeoutError;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

/// How often an idle feed thread checks its stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Running feed: shared state plus the thread that folds events into it
///
/// Dropping the handle (or calling [`stop`](FeedHandle::stop)) releases the
/// feed's channel registration and joins the thread. The shared connection
/// stays open for other consumers.
pub struct FeedHandle<F: ChannelFeed> {
    state: Arc<RwLock<F>>,
    channel: &'static str,
    client: ChannelHandle,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Subscribe `feed` to its channel and start folding messages into it
///
/// Messages are applied one at a time on a dedicated OS thread, in the order
/// the connection delivered them.
pub fn spawn_feed<F: ChannelFeed>(client: &ChannelHandle, feed: F) -> FeedHandle<F> {
    let channel = feed.channel();
    let events = client.listen();
    client.subscribe_channel(channel);

    // Liveness comes from the event stream, which opens with Opened when
    // the connection is already up
    let state = Arc::new(RwLock::new(feed));

    let running = Arc::new(AtomicBool::new(true));

    let thread = {
        let state = Arc::clone(&state);
        let running = Arc::clone(&running);

        std::thread::spawn(move || {
            loop {
                match events.recv_timeout(POLL_INTERVAL) {
                    Ok(ChannelEvent::Message(message)) => state.write().apply(&message),
                    Ok(ChannelEvent::Opened) => state.write().on_connection_change(true),
                    Ok(ChannelEvent::Closed(_)) => state.write().on_connection_change(false),
                    Ok(_) => {}
                    Err(RecvTimeoutError::Timeout) => {
                        if !running.load(Ordering::Acquire) {
                            debug!("Stop flag detected, feed thread for '{}' exiting", channel);
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        debug!("Event stream closed, feed thread for '{}' exiting", channel);
                        break;
                    }
                }
            }
        })
    };

    info!("Feed started for channel '{}'", channel);

    FeedHandle {
        state,
        channel,
        client: client.clone(),
        running,
        thread: Some(thread),
    }
}

impl<F: ChannelFeed> FeedHandle<F> {
    /// Read the current feed state
    pub fn read(&self) -> RwLockReadGuard<'_, F> {
        self.state.read()
    }

    /// Shared state, for consumers that outlive this handle's borrow
    pub fn state(&self) -> Arc<RwLock<F>> {
        Arc::clone(&self.state)
    }

    pub fn channel(&self) -> &'static str {
        self.channel
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| !thread.is_finished())
    }

    /// Unsubscribe and wait for the feed thread to finish
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.client.unsubscribe_channel(self.channel);
        self.running.store(false, Ordering::Release);

        if thread.join().is_err() {
            debug!("Feed thread for '{}' panicked", self.channel);
        }
        info!("Feed stopped for channel '{}'", self.channel);
    }
}

impl<F: ChannelFeed> Drop for FeedHandle<F> {
    fn drop(&mut self) {
        self.halt();
    }
}
