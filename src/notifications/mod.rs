use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;

pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    /// `None` keeps the toast until it is removed explicitly.
    pub expires_at: Option<Instant>,
}

/// User-visible toasts. Expiry is checked by `prune_expired`, driven by the UI tick.
#[derive(Debug)]
pub struct NotificationQueue {
    items: watch::Sender<Vec<Notification>>,
    next_id: AtomicU64,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self {
            items,
            next_id: AtomicU64::new(0),
        }
    }
}

impl NotificationQueue {
    pub fn show(&self, message: impl Into<String>, kind: NotificationKind, duration: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let expires_at = (!duration.is_zero()).then(|| Instant::now() + duration);
        let notification = Notification {
            id,
            message: message.into(),
            kind,
            expires_at,
        };
        self.items.send_modify(|items| items.push(notification));
        id
    }

    pub fn show_success(&self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Success, DEFAULT_DURATION)
    }

    pub fn show_error(&self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Error, DEFAULT_DURATION)
    }

    pub fn show_info(&self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Info, DEFAULT_DURATION)
    }

    pub fn remove(&self, id: u64) -> bool {
        self.items.send_if_modified(|items| {
            let before = items.len();
            items.retain(|n| n.id != id);
            items.len() != before
        })
    }

    /// Drop every toast whose deadline is at or before `now`.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.items.send_if_modified(|items| {
            let before = items.len();
            items.retain(|n| n.expires_at.is_none_or(|deadline| deadline > now));
            removed = before - items.len();
            removed > 0
        });
        removed
    }

    pub fn visible(&self) -> Vec<Notification> {
        self.items.borrow().clone()
    }
}
