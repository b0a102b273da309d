//! # Toasts
//!
//! Process-wide queue of transient, user-facing notifications.
//!
//! ## Features
//!
//! - **Append/remove only**: toasts are immutable once enqueued
//! - **Auto-expiry**: every toast with a non-zero duration owns exactly one timer
//! - **Idempotent removal**: removing an unknown id is a no-op
//! - **Thread-safe handle**: enqueue from async tasks or plain OS threads
//!
//! ## Example
//!
//! ```rust,ignore
//! use toasts::ToastProvider;
//!
//! let provider = ToastProvider::current();
//! let queue = provider.queue();
//!
//! queue.success("Saved", None);
//! queue.error("Upload failed", Some("Try again later".into()));
//!
//! for toast in queue.toasts() {
//!     println!("[{}] {}", toast.kind(), toast.title());
//! }
//! ```

pub mod queue;
pub mod store;
pub mod toast;

pub use queue::{ToastProvider, ToastQueue};
pub use store::{ToastOp, ToastStore};
pub use toast::{NewToast, Toast, ToastAction, ToastId, ToastKind};

/// Default lifetime for toasts that do not specify one (ms)
pub const DEFAULT_DURATION_MS: u64 = 5000;

/// Default lifetime for `error` toasts (ms)
pub const ERROR_DURATION_MS: u64 = 7000;

/// Default lifetime for `warning` toasts (ms)
pub const WARNING_DURATION_MS: u64 = 6000;
