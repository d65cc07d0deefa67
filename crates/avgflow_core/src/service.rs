use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::info;

use crate::{
    engagement::{EngagementFlow, SendError, SentWish},
    feed::{self, Activation, FeedView},
    identity::{find_user, AdminPolicy, User},
    notification::Notification,
    store::{NotificationStore, StoreError},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CenterError {
    #[error("only administrators can clear notifications")]
    NotPrivileged,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Send(#[from] SendError),
}

/// Header-side controller: bell feed, detail view and the wish compose flow
/// for the signed-in viewer.
pub struct NotificationCenter {
    store: Arc<dyn NotificationStore>,
    users: Vec<User>,
    viewer: User,
    policy: AdminPolicy,
    engagement: EngagementFlow,
    detail: Option<Notification>,
}

pub struct NotificationCenterBuilder {
    store: Option<Arc<dyn NotificationStore>>,
    users: Vec<User>,
    viewer_id: Option<String>,
    admin_emails: Vec<String>,
}

impl NotificationCenterBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            users: Vec::new(),
            viewer_id: None,
            admin_emails: Vec::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn NotificationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn add_user(mut self, user: User) -> Self {
        Self::push_unique(&mut self.users, user);
        self
    }

    pub fn with_users(mut self, users: impl IntoIterator<Item = User>) -> Self {
        for user in users {
            Self::push_unique(&mut self.users, user);
        }
        self
    }

    pub fn with_viewer(mut self, user_id: impl Into<String>) -> Self {
        self.viewer_id = Some(user_id.into());
        self
    }

    pub fn with_admin_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_emails.extend(emails.into_iter().map(Into::into));
        self
    }

    /// Without an explicit viewer the first loaded user signs in.
    pub fn build(self) -> Result<NotificationCenter> {
        let store = self
            .store
            .ok_or_else(|| anyhow!("notification store not configured"))?;
        let viewer = match &self.viewer_id {
            Some(id) => find_user(&self.users, id)
                .cloned()
                .ok_or_else(|| anyhow!("viewer `{id}` is not a loaded user"))?,
            None => self
                .users
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("no users loaded"))?,
        };
        let policy = AdminPolicy::new(&self.admin_emails);
        info!(
            viewer = %viewer.id,
            users = self.users.len(),
            privileged = policy.is_privileged(&viewer),
            "notification center ready"
        );
        Ok(NotificationCenter {
            store,
            users: self.users,
            viewer,
            policy,
            engagement: EngagementFlow::Closed,
            detail: None,
        })
    }

    fn push_unique(users: &mut Vec<User>, user: User) {
        if !users.iter().any(|existing| existing.id == user.id) {
            users.push(user);
        }
    }
}

impl Default for NotificationCenterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn builder() -> NotificationCenterBuilder {
        NotificationCenterBuilder::new()
    }

    pub fn viewer(&self) -> &User {
        &self.viewer
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    pub fn user_name(&self, id: &str) -> Option<&str> {
        find_user(&self.users, id).map(|user| user.name.as_str())
    }

    pub fn can_clear_all(&self) -> bool {
        self.policy.is_privileged(&self.viewer)
    }

    pub fn feed<Tz>(&self, tz: &Tz) -> FeedView
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        feed::build_feed(&self.store.notifications(), self.can_clear_all(), tz)
    }

    pub fn unread_count(&self) -> usize {
        feed::unread_count(&self.store.notifications())
    }

    /// Handles a click on a feed row.
    pub fn activate(&mut self, id: &str) -> Result<(), CenterError> {
        match feed::activate(self.store.as_ref(), id)? {
            Activation::ShowDetail(notification) => {
                self.detail = Some(notification);
            }
            Activation::Compose(request) => {
                self.detail = None;
                self.engagement.open(request);
            }
        }
        Ok(())
    }

    pub fn detail(&self) -> Option<&Notification> {
        self.detail.as_ref()
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    pub fn engagement(&self) -> &EngagementFlow {
        &self.engagement
    }

    pub fn set_draft_message(&mut self, message: impl Into<String>) {
        self.engagement.set_message(message);
    }

    pub fn quick_insert(&mut self, index: usize) -> bool {
        self.engagement.quick_insert(index)
    }

    pub fn can_send(&self) -> bool {
        self.engagement.can_send(&self.users)
    }

    pub fn send_wish(&mut self, now: DateTime<Utc>) -> Result<SentWish, CenterError> {
        let sent = self
            .engagement
            .send(&self.viewer, &self.users, self.store.as_ref(), now)?;
        Ok(sent)
    }

    pub fn cancel_compose(&mut self) {
        self.engagement.cancel();
    }

    pub fn clear_all(&mut self) -> Result<usize, CenterError> {
        if !self.can_clear_all() {
            tracing::warn!(viewer = %self.viewer.id, "clear all refused");
            return Err(CenterError::NotPrivileged);
        }
        let removed = self.store.clear_all();
        self.detail = None;
        info!(removed, viewer = %self.viewer.id, "notifications cleared");
        Ok(removed)
    }

    pub fn mark_all_read(&mut self) -> usize {
        self.store.mark_all_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{notification::Severity, store::InMemoryNotificationStore, wish::WishKind};

    fn center(viewer: &str) -> NotificationCenter {
        let store = InMemoryNotificationStore::new();
        store
            .add_notification(
                Notification::new("BIRTHDAY-TODAY-U2-1", "Sinh nhật", "m", Severity::Info)
                    .at("2025-01-01T08:00:00Z"),
            )
            .unwrap();
        store
            .add_notification(
                Notification::new("TASK-1", "Task", "m", Severity::Alert)
                    .at("2025-01-02T08:00:00Z"),
            )
            .unwrap();
        NotificationCenter::builder()
            .with_store(Arc::new(store))
            .add_user(User::new("U1", "Lan", "lan@avg.vn"))
            .add_user(User::new("U2", "Minh", "minh@avg.vn"))
            .with_admin_emails(["lan@avg.vn"])
            .with_viewer(viewer)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_known_viewer_and_store() {
        assert!(NotificationCenter::builder().build().is_err());
        let result = NotificationCenter::builder()
            .with_store(Arc::new(InMemoryNotificationStore::new()))
            .add_user(User::new("U1", "Lan", ""))
            .with_viewer("U9")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn generic_click_opens_detail_and_prompt_opens_compose() {
        let mut center = center("U1");
        assert_eq!(center.unread_count(), 2);

        center.activate("TASK-1").unwrap();
        assert_eq!(center.detail().map(|n| n.id.as_str()), Some("TASK-1"));
        assert!(!center.engagement().is_open());

        center.activate("BIRTHDAY-TODAY-U2-1").unwrap();
        assert!(center.detail().is_none());
        let draft = center.engagement().draft().unwrap();
        assert_eq!(draft.kind, WishKind::Birthday);
        assert_eq!(draft.target_user_id, "U2");
        assert_eq!(center.unread_count(), 0);
    }

    #[test]
    fn send_through_center_uses_viewer_as_sender() {
        let mut center = center("U1");
        center.activate("BIRTHDAY-TODAY-U2-1").unwrap();
        center.quick_insert(1);
        assert!(center.can_send());
        let sent = center.send_wish(Utc::now()).unwrap();
        assert_eq!(sent.wish.from_user_name, "Lan");
        assert_eq!(center.store().wishes().len(), 1);
        assert_eq!(center.unread_count(), 2);
        assert!(!center.engagement().is_open());
    }

    #[test]
    fn only_privileged_viewers_clear_all() {
        let mut staff = center("U2");
        assert!(!staff.feed(&Utc).can_clear_all);
        assert_eq!(staff.clear_all(), Err(CenterError::NotPrivileged));
        assert_eq!(staff.store().notifications().len(), 2);

        let mut admin = center("U1");
        assert!(admin.feed(&Utc).can_clear_all);
        assert_eq!(admin.clear_all(), Ok(2));
        assert!(admin.feed(&Utc).is_empty());
    }

    #[test]
    fn feed_is_newest_first() {
        let center = center("U2");
        let feed = center.feed(&Utc);
        assert_eq!(feed.rows[0].id, "TASK-1");
        assert_eq!(center.user_name("U2"), Some("Minh"));
    }
}
