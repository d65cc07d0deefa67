use parking_lot::RwLock;
use thiserror::Error;

use crate::{notification::Notification, seed::Seed, wish::Wish};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("notification `{0}` not found")]
    UnknownNotification(String),
    #[error("record `{0}` already exists")]
    Duplicate(String),
}

/// Backing collection of notifications and wishes. The desktop shell only
/// ever talks to this trait, so a networked implementation can replace the
/// in-memory one without touching the feed or the compose flow.
pub trait NotificationStore: Send + Sync {
    fn notifications(&self) -> Vec<Notification>;
    /// Returns `true` when the record changed from unread to read.
    fn mark_read(&self, id: &str) -> Result<bool, StoreError>;
    fn mark_all_read(&self) -> usize;
    fn clear_all(&self) -> usize;
    fn add_notification(&self, notification: Notification) -> Result<(), StoreError>;
    /// Stores a wish together with the notification announcing it. Either
    /// both records land or neither does.
    fn record_wish(&self, wish: Wish, announcement: Notification) -> Result<(), StoreError>;
    fn wishes(&self) -> Vec<Wish>;
}

#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
    wishes: RwLock<Vec<Wish>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: &Seed) -> Self {
        Self {
            notifications: RwLock::new(seed.notifications.clone()),
            wishes: RwLock::new(seed.wishes.clone()),
        }
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().clone()
    }

    fn mark_read(&self, id: &str) -> Result<bool, StoreError> {
        let mut notifications = self.notifications.write();
        let notification = notifications
            .iter_mut()
            .find(|candidate| candidate.id == id)
            .ok_or_else(|| StoreError::UnknownNotification(id.to_string()))?;
        let changed = !notification.read;
        notification.read = true;
        Ok(changed)
    }

    fn mark_all_read(&self) -> usize {
        let mut notifications = self.notifications.write();
        let mut changed = 0;
        for notification in notifications.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }

    fn clear_all(&self) -> usize {
        let mut notifications = self.notifications.write();
        let removed = notifications.len();
        notifications.clear();
        removed
    }

    fn add_notification(&self, notification: Notification) -> Result<(), StoreError> {
        let mut notifications = self.notifications.write();
        if notifications.iter().any(|n| n.id == notification.id) {
            return Err(StoreError::Duplicate(notification.id));
        }
        tracing::debug!(id = %notification.id, "notification added");
        notifications.push(notification);
        Ok(())
    }

    fn record_wish(&self, wish: Wish, announcement: Notification) -> Result<(), StoreError> {
        let mut notifications = self.notifications.write();
        let mut wishes = self.wishes.write();
        if wishes.iter().any(|w| w.id == wish.id) {
            return Err(StoreError::Duplicate(wish.id));
        }
        if notifications.iter().any(|n| n.id == announcement.id) {
            return Err(StoreError::Duplicate(announcement.id));
        }
        tracing::debug!(
            id = %wish.id,
            to = %wish.to_user_id,
            announcement = %announcement.id,
            "wish recorded"
        );
        wishes.push(wish);
        notifications.push(announcement);
        Ok(())
    }

    fn wishes(&self) -> Vec<Wish> {
        self.wishes.read().clone()
    }
}
