//! Reducer-style toast collection
//!
//! The store only supports two operations: append a new toast and remove an
//! existing one. Entries are never edited in place.

use crate::toast::{Toast, ToastId};

/// Mutation applied to a [`ToastStore`]
#[derive(Debug, Clone)]
pub enum ToastOp {
    Append(Toast),
    Remove(ToastId),
}

/// Ordered toast collection (insertion order)
#[derive(Debug, Default, Clone)]
pub struct ToastStore {
    toasts: Vec<Toast>,
}

impl ToastStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an operation, returning whether the collection changed
    ///
    /// Appending an id that is already present and removing an id that is
    /// absent are both no-ops.
    pub fn reduce(&mut self, op: ToastOp) -> bool {
        match op {
            ToastOp::Append(toast) => {
                if self.contains(toast.id()) {
                    return false;
                }
                self.toasts.push(toast);
                true
            }
            ToastOp::Remove(id) => {
                let before = self.toasts.len();
                self.toasts.retain(|t| t.id() != id);
                self.toasts.len() != before
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.toasts.iter().any(|t| t.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&Toast> {
        self.toasts.iter().find(|t| t.id() == id)
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn as_slice(&self) -> &[Toast] {
        &self.toasts
    }
}
