use crate::DEFAULT_DURATION_MS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Unique identifier assigned to a toast at enqueue time
pub type ToastId = String;

/// Category of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Warning => "warning",
            ToastKind::Info => "info",
        }
    }
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single user-triggerable follow-up attached to a toast
#[derive(Clone)]
pub struct ToastAction {
    pub label: String,
    on_click: Arc<dyn Fn() + Send + Sync>,
}

impl ToastAction {
    pub fn new(label: impl Into<String>, on_click: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            on_click: Arc::new(on_click),
        }
    }

    /// Run the action callback
    pub fn trigger(&self) {
        (self.on_click)();
    }
}

impl fmt::Debug for ToastAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Request to enqueue a toast (everything but the id)
///
/// `duration_ms` follows the dashboard convention:
/// - `None` or a negative value: use [`DEFAULT_DURATION_MS`]
/// - `Some(0)`: never auto-remove
/// - `Some(n)`: remove after `n` milliseconds
#[derive(Debug, Clone)]
pub struct NewToast {
    pub title: String,
    pub message: Option<String>,
    pub kind: ToastKind,
    pub duration_ms: Option<i64>,
    pub action: Option<ToastAction>,
}

impl NewToast {
    pub fn new(kind: ToastKind, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: None,
            kind,
            duration_ms: None,
            action: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn action(mut self, action: ToastAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Effective lifetime in milliseconds, with invalid values clamped to the default
    pub fn resolved_duration_ms(&self) -> u64 {
        match self.duration_ms {
            Some(ms) if ms >= 0 => ms as u64,
            _ => DEFAULT_DURATION_MS,
        }
    }

    pub(crate) fn into_toast(self, id: ToastId) -> Toast {
        let duration_ms = self.resolved_duration_ms();
        Toast {
            id,
            title: self.title,
            message: self.message,
            kind: self.kind,
            duration_ms,
            action: self.action,
        }
    }
}

/// An enqueued toast. Fields are read-only once created.
#[derive(Debug, Clone)]
pub struct Toast {
    id: ToastId,
    title: String,
    message: Option<String>,
    kind: ToastKind,
    duration_ms: u64,
    action: Option<ToastAction>,
}

impl Toast {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn kind(&self) -> ToastKind {
        self.kind
    }

    /// Lifetime in milliseconds; `0` means the toast stays until removed
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn action(&self) -> Option<&ToastAction> {
        self.action.as_ref()
    }

    /// Expiry delay, or `None` for persistent toasts
    pub fn expires_after(&self) -> Option<Duration> {
        (self.duration_ms > 0).then(|| Duration::from_millis(self.duration_ms))
    }
}
