use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    identity::{find_user, User},
    notification::{ComposeRequest, Notification, NotificationRoute, Severity},
    store::{NotificationStore, StoreError},
    wish::{Wish, WishKind},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("no wish is being composed")]
    NotOpen,
    #[error("the message is empty")]
    EmptyMessage,
    #[error("recipient `{0}` is not a known user")]
    UnknownRecipient(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishDraft {
    pub kind: WishKind,
    pub target_user_id: String,
    pub message: String,
}

/// Receipt for a delivered wish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentWish {
    pub wish: Wish,
    pub announcement_id: String,
    pub confirmation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EngagementFlow {
    #[default]
    Closed,
    Open(WishDraft),
}

impl EngagementFlow {
    pub fn is_open(&self) -> bool {
        matches!(self, EngagementFlow::Open(_))
    }

    pub fn draft(&self) -> Option<&WishDraft> {
        match self {
            EngagementFlow::Open(draft) => Some(draft),
            EngagementFlow::Closed => None,
        }
    }

    /// Opens (or re-targets) the compose flow, seeding the kind template.
    pub fn open(&mut self, request: ComposeRequest) {
        let kind = request.kind();
        debug_assert!(!request.target_user_id().is_empty());
        *self = EngagementFlow::Open(WishDraft {
            kind,
            target_user_id: request.target_user_id().to_string(),
            message: kind.template().to_string(),
        });
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        if let EngagementFlow::Open(draft) = self {
            draft.message = message.into();
        }
    }

    /// Appends the `index`th quick-insert suffix. Returns `false` when closed
    /// or the index is out of range.
    pub fn quick_insert(&mut self, index: usize) -> bool {
        let EngagementFlow::Open(draft) = self else {
            return false;
        };
        let Some(suffix) = draft.kind.quick_inserts().get(index).copied() else {
            return false;
        };
        draft.message.push_str(suffix);
        true
    }

    pub fn cancel(&mut self) {
        if self.is_open() {
            debug!("wish draft discarded");
        }
        *self = EngagementFlow::Closed;
    }

    pub fn can_send(&self, users: &[User]) -> bool {
        self.draft()
            .map(|draft| {
                !draft.message.trim().is_empty()
                    && find_user(users, &draft.target_user_id).is_some()
            })
            .unwrap_or(false)
    }

    /// Emits one wish plus one announcing notification and closes the flow.
    /// On any validation or store failure nothing is written and the draft is
    /// kept.
    pub fn send(
        &mut self,
        sender: &User,
        users: &[User],
        store: &dyn NotificationStore,
        now: DateTime<Utc>,
    ) -> Result<SentWish, SendError> {
        let draft = self.draft().ok_or(SendError::NotOpen)?;
        let message = draft.message.trim();
        if message.is_empty() {
            return Err(SendError::EmptyMessage);
        }
        let recipient = find_user(users, &draft.target_user_id).ok_or_else(|| {
            warn!(target_user = %draft.target_user_id, "wish recipient not found");
            SendError::UnknownRecipient(draft.target_user_id.clone())
        })?;

        let wish = Wish {
            id: uuid::Uuid::new_v4().to_string(),
            from_user_id: sender.id.clone(),
            from_user_name: sender.name.clone(),
            to_user_id: recipient.id.clone(),
            message: message.to_string(),
            timestamp: now,
            is_read: false,
            kind: draft.kind,
        };
        let announcement = Notification {
            id: NotificationRoute::Opaque.encode(now.timestamp_millis()),
            title: "Lời chúc mới".to_string(),
            message: format!(
                "{} đã gửi lời chúc {} tới {}",
                sender.name,
                draft.kind.label(),
                recipient.name
            ),
            time: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            read: false,
            severity: Severity::Success,
        };
        let announcement_id = announcement.id.clone();
        let confirmation = format!("Đã gửi lời chúc tới {}!", recipient.name);

        store.record_wish(wish.clone(), announcement)?;
        info!(wish = %wish.id, kind = ?wish.kind, to = %wish.to_user_id, "wish sent");

        *self = EngagementFlow::Closed;
        Ok(SentWish {
            wish,
            announcement_id,
            confirmation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::classify;
    use crate::store::InMemoryNotificationStore;

    /// Accepts reads but refuses every wish.
    struct RejectingStore;

    impl NotificationStore for RejectingStore {
        fn notifications(&self) -> Vec<Notification> {
            Vec::new()
        }

        fn mark_read(&self, id: &str) -> Result<bool, StoreError> {
            Err(StoreError::UnknownNotification(id.to_string()))
        }

        fn mark_all_read(&self) -> usize {
            0
        }

        fn clear_all(&self) -> usize {
            0
        }

        fn add_notification(&self, notification: Notification) -> Result<(), StoreError> {
            Err(StoreError::Duplicate(notification.id))
        }

        fn record_wish(&self, _wish: Wish, announcement: Notification) -> Result<(), StoreError> {
            Err(StoreError::Duplicate(announcement.id))
        }

        fn wishes(&self) -> Vec<Wish> {
            Vec::new()
        }
    }

    fn users() -> Vec<User> {
        vec![
            User::new("U1", "Lan", "lan@avg.vn"),
            User::new("U2", "Minh", "minh@avg.vn"),
        ]
    }

    fn request(id: &str) -> ComposeRequest {
        let notification = Notification::new(id, "t", "m", Severity::Info);
        classify(&notification).compose_request().expect("prompt id")
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-28T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn open_seeds_kind_template_and_quick_insert_appends() {
        let mut flow = EngagementFlow::default();
        flow.open(request("BROADCAST-wedding-U2-1"));
        let template = WishKind::Wedding.template();
        assert_eq!(flow.draft().unwrap().message, template);

        assert!(flow.quick_insert(0));
        assert!(!flow.quick_insert(3));
        assert_eq!(flow.draft().unwrap().message, format!("{template}💍"));
    }

    #[test]
    fn whitespace_message_is_rejected_without_writes() {
        let store = InMemoryNotificationStore::new();
        let users = users();
        let mut flow = EngagementFlow::default();
        flow.open(request("BIRTHDAY-TODAY-U2-1"));
        flow.set_message("   \n\t");

        assert!(!flow.can_send(&users));
        assert_eq!(
            flow.send(&users[0], &users, &store, now()),
            Err(SendError::EmptyMessage)
        );
        assert!(flow.is_open());
        assert!(store.wishes().is_empty());
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn unknown_recipient_writes_nothing() {
        let store = InMemoryNotificationStore::new();
        let users = users();
        let mut flow = EngagementFlow::default();
        flow.open(request("BIRTHDAY-TODAY-U404-1"));

        assert!(!flow.can_send(&users));
        assert_eq!(
            flow.send(&users[0], &users, &store, now()),
            Err(SendError::UnknownRecipient("U404".into()))
        );
        assert!(flow.is_open());
        assert!(store.wishes().is_empty());
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn successful_send_emits_one_wish_and_one_notification() {
        let store = InMemoryNotificationStore::new();
        let users = users();
        let mut flow = EngagementFlow::default();
        flow.open(request("BIRTHDAY-TODAY-U2-1"));
        flow.set_message("  Chúc mừng sinh nhật Minh!  ");

        assert!(flow.can_send(&users));
        let sent = flow.send(&users[0], &users, &store, now()).expect("send");

        assert_eq!(flow, EngagementFlow::Closed);
        assert!(flow.draft().is_none());
        let wishes = store.wishes();
        assert_eq!(wishes.len(), 1);
        assert_eq!(wishes[0], sent.wish);
        assert_eq!(sent.wish.message, "Chúc mừng sinh nhật Minh!");
        assert_eq!(sent.wish.from_user_id, "U1");
        assert_eq!(sent.wish.to_user_id, "U2");
        assert_eq!(sent.wish.kind, WishKind::Birthday);
        assert!(!sent.wish.is_read);
        assert_eq!(sent.wish.timestamp, now());

        let notifications = store.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].id, sent.announcement_id);
        assert_eq!(notifications[0].severity, Severity::Success);
        assert!(sent.confirmation.contains("Minh"));
    }

    #[test]
    fn repeated_sends_get_distinct_ids() {
        let store = InMemoryNotificationStore::new();
        let users = users();
        let mut flow = EngagementFlow::default();
        for _ in 0..2 {
            flow.open(request("BIRTHDAY-TODAY-U2-1"));
            flow.send(&users[0], &users, &store, now()).expect("send");
        }
        let wishes = store.wishes();
        assert_eq!(wishes.len(), 2);
        assert_ne!(wishes[0].id, wishes[1].id);
        assert_eq!(store.notifications().len(), 2);
    }

    #[test]
    fn cancel_discards_draft_and_send_when_closed_fails() {
        let store = InMemoryNotificationStore::new();
        let users = users();
        let mut flow = EngagementFlow::default();
        flow.open(request("BROADCAST-funeral-U2-1"));
        flow.cancel();
        assert_eq!(flow, EngagementFlow::Closed);
        assert_eq!(
            flow.send(&users[0], &users, &store, now()),
            Err(SendError::NotOpen)
        );
        assert!(store.wishes().is_empty());
    }

    #[test]
    fn store_rejection_keeps_the_draft_open() {
        let users = users();
        let mut flow = EngagementFlow::default();
        flow.open(request("BIRTHDAY-TODAY-U2-1"));
        flow.set_message("Chúc mừng!");

        let err = flow
            .send(&users[0], &users, &RejectingStore, now())
            .unwrap_err();
        assert!(matches!(err, SendError::Store(StoreError::Duplicate(_))));
        assert!(flow.is_open());
        assert_eq!(flow.draft().unwrap().message, "Chúc mừng!");
    }
}
