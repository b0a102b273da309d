//! Toast queue handle and provider
//!
//! # Architecture
//!
//! ```text
//! add_toast() ──> ToastStore::reduce(Append) ──> watch snapshot ──> renderer
//!      │
//!      └──> expiry task (sleep_until deadline) ──> ToastStore::reduce(Remove)
//!                 ▲
//! remove_toast() ─┘ aborts the task, then reduces Remove
//! ```
//!
//! Expiry tasks run on the runtime captured by [`ToastProvider`], so any
//! thread holding a [`ToastQueue`] can enqueue, including feed threads that
//! are not inside a Tokio context.

use crate::store::{ToastOp, ToastStore};
use crate::toast::{NewToast, Toast, ToastId, ToastKind};
use crate::{ERROR_DURATION_MS, WARNING_DURATION_MS};
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

const TOAST_ID_LEN: usize = 9;

struct QueueInner {
    /// Lock order: `timers` before `store` whenever both are held
    timers: Mutex<HashMap<ToastId, JoinHandle<()>>>,
    store: Mutex<ToastStore>,
    snapshot_tx: watch::Sender<Vec<Toast>>,
    runtime: Handle,
    closed: AtomicBool,
}

impl QueueInner {
    fn publish(&self, store: &ToastStore) {
        self.snapshot_tx.send_replace(store.as_slice().to_vec());
    }

    /// Timer-driven removal. The timer entry belongs to the running task, so
    /// it is dropped rather than aborted.
    fn expire(&self, id: &str) {
        self.timers.lock().remove(id);

        let mut store = self.store.lock();
        if store.reduce(ToastOp::Remove(id.to_string())) {
            debug!("Toast {} expired", id);
            self.publish(&store);
        }
    }

    fn teardown(&self) {
        self.closed.store(true, Ordering::Release);
        let timers: Vec<_> = self.timers.lock().drain().collect();
        debug!("Cancelling {} pending toast timers", timers.len());
        for (_, handle) in timers {
            handle.abort();
        }
    }
}

/// Cloneable handle to the process-wide toast collection
#[derive(Clone)]
pub struct ToastQueue {
    inner: Arc<QueueInner>,
}

impl ToastQueue {
    fn new(runtime: Handle) -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(QueueInner {
                timers: Mutex::new(HashMap::new()),
                store: Mutex::new(ToastStore::new()),
                snapshot_tx,
                runtime,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueue a toast and schedule its expiry
    ///
    /// Returns the generated id. After the owning provider has been torn
    /// down the toast is discarded.
    pub fn add_toast(&self, toast: NewToast) -> ToastId {
        let mut timers = self.inner.timers.lock();
        let mut store = self.inner.store.lock();

        let id = unique_id(&store);

        if self.inner.closed.load(Ordering::Acquire) {
            debug!("Toast queue closed, discarding '{}'", toast.title);
            return id;
        }

        let toast = toast.into_toast(id.clone());
        let expiry = toast.expires_after();
        debug!("Toast {} [{}]: {}", id, toast.kind(), toast.title());

        store.reduce(ToastOp::Append(toast));
        self.inner.publish(&store);
        drop(store);

        if let Some(delay) = expiry {
            // Deadline is fixed now, not when the task is first polled
            let deadline = Instant::now() + delay;
            let weak: Weak<QueueInner> = Arc::downgrade(&self.inner);
            let timer_id = id.clone();

            let handle = self.inner.runtime.spawn(async move {
                sleep_until(deadline).await;
                if let Some(inner) = weak.upgrade() {
                    inner.expire(&timer_id);
                }
            });
            timers.insert(id.clone(), handle);
        }

        id
    }

    /// Remove a toast and cancel its timer. Unknown ids are ignored.
    pub fn remove_toast(&self, id: &str) {
        if let Some(handle) = self.inner.timers.lock().remove(id) {
            handle.abort();
        }

        let mut store = self.inner.store.lock();
        if store.reduce(ToastOp::Remove(id.to_string())) {
            debug!("Toast {} removed", id);
            self.inner.publish(&store);
        }
    }

    pub fn success(&self, title: impl Into<String>, message: Option<String>) -> ToastId {
        self.add_toast(with_message(NewToast::new(ToastKind::Success, title), message))
    }

    /// Error toast; `duration_ms` falls back to 7000 ms
    pub fn error(
        &self,
        title: impl Into<String>,
        message: Option<String>,
        duration_ms: Option<i64>,
    ) -> ToastId {
        let toast = NewToast::new(ToastKind::Error, title)
            .duration_ms(duration_ms.unwrap_or(ERROR_DURATION_MS as i64));
        self.add_toast(with_message(toast, message))
    }

    /// Warning toast; `duration_ms` falls back to 6000 ms
    pub fn warning(
        &self,
        title: impl Into<String>,
        message: Option<String>,
        duration_ms: Option<i64>,
    ) -> ToastId {
        let toast = NewToast::new(ToastKind::Warning, title)
            .duration_ms(duration_ms.unwrap_or(WARNING_DURATION_MS as i64));
        self.add_toast(with_message(toast, message))
    }

    pub fn info(&self, title: impl Into<String>, message: Option<String>) -> ToastId {
        self.add_toast(with_message(NewToast::new(ToastKind::Info, title), message))
    }

    /// Snapshot of the live collection in insertion order
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.store.lock().as_slice().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<Toast> {
        self.inner.store.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.lock().is_empty()
    }

    /// Number of expiry timers still outstanding
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.lock().len()
    }

    /// Watch the live collection (for the rendering surface)
    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.inner.snapshot_tx.subscribe()
    }
}

impl std::fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastQueue")
            .field("len", &self.len())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

/// Owner of the process-wide toast queue
///
/// Created once when the application starts. Dropping it cancels every
/// outstanding expiry timer; queue handles that outlive it discard new
/// toasts.
pub struct ToastProvider {
    queue: ToastQueue,
}

impl ToastProvider {
    /// Create a provider whose timers run on `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            queue: ToastQueue::new(runtime),
        }
    }

    /// Create a provider on the current Tokio runtime
    ///
    /// # Panics
    /// Panics when called outside of a Tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn queue(&self) -> ToastQueue {
        self.queue.clone()
    }
}

impl Drop for ToastProvider {
    fn drop(&mut self) {
        self.queue.inner.teardown();
    }
}

fn with_message(toast: NewToast, message: Option<String>) -> NewToast {
    match message {
        Some(message) => toast.message(message),
        None => toast,
    }
}

fn unique_id(store: &ToastStore) -> ToastId {
    loop {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOAST_ID_LEN)
            .map(char::from)
            .collect();
        if !store.contains(&id) {
            return id;
        }
    }
}
