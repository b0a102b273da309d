use super::{decode, NOTIFICATIONS_CHANNEL};
use crate::traits::{kinds, ChannelFeed, ChannelMessage};
use serde::{Deserialize, Serialize};
use toasts::ToastQueue;
use tracing::debug;

/// One user notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncPayload {
    notifications: Vec<Notification>,
    #[serde(default)]
    unread_count: Option<usize>,
}

/// Notification inbox with an unread counter
///
/// New notifications also raise an `info` toast when a queue is attached.
#[derive(Debug, Default)]
pub struct NotificationsFeed {
    /// Newest first
    notifications: Vec<Notification>,
    unread: usize,
    toasts: Option<ToastQueue>,
}

impl NotificationsFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_toasts(queue: ToastQueue) -> Self {
        Self {
            toasts: Some(queue),
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.unread
    }

    fn push(&mut self, notification: Notification) {
        if !notification.read {
            self.unread += 1;
        }

        if let Some(queue) = &self.toasts {
            queue.info(notification.title.clone(), notification.message.clone());
        }

        self.notifications.insert(0, notification);
    }

    fn mark_read(&mut self, id: &str) {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) if !notification.read => {
                notification.read = true;
                self.unread = self.unread.saturating_sub(1);
            }
            Some(_) => {}
            None => debug!("notification_read for unknown id '{}'", id),
        }
    }

    fn sync(&mut self, payload: SyncPayload) {
        self.unread = payload
            .unread_count
            .unwrap_or_else(|| payload.notifications.iter().filter(|n| !n.read).count());
        self.notifications = payload.notifications;
    }
}

impl ChannelFeed for NotificationsFeed {
    fn channel(&self) -> &'static str {
        NOTIFICATIONS_CHANNEL
    }

    fn apply(&mut self, message: &ChannelMessage) {
        match message.kind.as_str() {
            kinds::NEW_NOTIFICATION => {
                if let Some(notification) = decode(message) {
                    self.push(notification);
                }
            }
            kinds::NOTIFICATION_READ => {
                if let Some(ReadPayload { id }) = decode(message) {
                    self.mark_read(&id);
                }
            }
            kinds::NOTIFICATIONS_SYNC => {
                if let Some(payload) = decode(message) {
                    self.sync(payload);
                }
            }
            other => debug!("Notifications feed ignoring '{}'", other),
        }
    }
}
