use serde::{Deserialize, Deserializer, Serialize};

use crate::wish::WishKind;

const BIRTHDAY_PREFIX: &str = "BIRTHDAY-TODAY-";
const BROADCAST_PREFIX: &str = "BROADCAST-";
const DELIMITER: char = '-';

/// Cosmetic severity carried in the `type` field. Anything unrecognised is
/// treated as `Error`, which is also the value for records without a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Alert,
    Success,
    Info,
    #[default]
    #[serde(other)]
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub read: bool,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub severity: Severity,
}

/// `null` reads as the field's default, same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Notification {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            time: None,
            read: false,
            severity,
        }
    }

    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn route(&self) -> NotificationRoute {
        NotificationRoute::decode(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeEvent {
    Wedding,
    Funeral,
}

impl LifeEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            LifeEvent::Wedding => "wedding",
            LifeEvent::Funeral => "funeral",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "wedding" => Some(LifeEvent::Wedding),
            "funeral" => Some(LifeEvent::Funeral),
            _ => None,
        }
    }
}

/// The follow-up action a notification id encodes.
///
/// Producers build ids with [`NotificationRoute::encode`] and consumers decode
/// them once with [`NotificationRoute::decode`]; nothing else splits ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRoute {
    BirthdayToday { user_id: String },
    Broadcast { event: LifeEvent, user_id: String },
    Opaque,
}

impl NotificationRoute {
    /// Total: malformed ids decode to `Opaque`.
    pub fn decode(id: &str) -> Self {
        if id.starts_with(BIRTHDAY_PREFIX) {
            return match nth_token(id, 2) {
                Some(user_id) => NotificationRoute::BirthdayToday {
                    user_id: user_id.to_string(),
                },
                None => NotificationRoute::Opaque,
            };
        }
        if id.starts_with(BROADCAST_PREFIX) {
            let event = nth_token(id, 1).and_then(LifeEvent::parse);
            let user_id = nth_token(id, 2);
            return match (event, user_id) {
                (Some(event), Some(user_id)) => NotificationRoute::Broadcast {
                    event,
                    user_id: user_id.to_string(),
                },
                _ => NotificationRoute::Opaque,
            };
        }
        NotificationRoute::Opaque
    }

    /// Builds an id for this route. `Opaque` routes get a bare unique id.
    pub fn encode(&self, timestamp_millis: i64) -> String {
        match self {
            NotificationRoute::BirthdayToday { user_id } => {
                format!("{BIRTHDAY_PREFIX}{user_id}{DELIMITER}{timestamp_millis}")
            }
            NotificationRoute::Broadcast { event, user_id } => format!(
                "{BROADCAST_PREFIX}{}{DELIMITER}{user_id}{DELIMITER}{timestamp_millis}",
                event.as_str()
            ),
            NotificationRoute::Opaque => uuid::Uuid::new_v4().to_string(),
        }
    }
}

fn nth_token(id: &str, index: usize) -> Option<&str> {
    id.split(DELIMITER)
        .nth(index)
        .filter(|token| !token.is_empty())
}

/// A compose request for the engagement flow. Only the classifier creates
/// these, so generic notifications can never open the compose modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    kind: WishKind,
    target_user_id: String,
}

impl ComposeRequest {
    pub fn kind(&self) -> WishKind {
        self.kind
    }

    pub fn target_user_id(&self) -> &str {
        &self.target_user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    Generic(&'a Notification),
    BirthdayPrompt {
        target_user_id: String,
    },
    LifeEventPrompt {
        event: LifeEvent,
        target_user_id: String,
    },
}

impl Classification<'_> {
    pub fn compose_request(&self) -> Option<ComposeRequest> {
        match self {
            Classification::Generic(_) => None,
            Classification::BirthdayPrompt { target_user_id } => Some(ComposeRequest {
                kind: WishKind::Birthday,
                target_user_id: target_user_id.clone(),
            }),
            Classification::LifeEventPrompt {
                event,
                target_user_id,
            } => Some(ComposeRequest {
                kind: WishKind::from(*event),
                target_user_id: target_user_id.clone(),
            }),
        }
    }
}

pub fn classify(notification: &Notification) -> Classification<'_> {
    match notification.route() {
        NotificationRoute::BirthdayToday { user_id } => Classification::BirthdayPrompt {
            target_user_id: user_id,
        },
        NotificationRoute::Broadcast { event, user_id } => Classification::LifeEventPrompt {
            event,
            target_user_id: user_id,
        },
        NotificationRoute::Opaque => Classification::Generic(notification),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_id(id: &str) -> Notification {
        Notification::new(id, "title", "message", Severity::Info)
    }

    #[test]
    fn unknown_prefixes_are_generic() {
        for id in ["", "-", "TASK-42", "birthday-today-U1-1", "BIRTHDAY-", "X"] {
            let notification = with_id(id);
            assert!(
                matches!(classify(&notification), Classification::Generic(_)),
                "{id} should classify as generic"
            );
        }
    }

    #[test]
    fn birthday_id_yields_target_user() {
        let notification = with_id("BIRTHDAY-TODAY-U123-999999999");
        assert_eq!(
            classify(&notification),
            Classification::BirthdayPrompt {
                target_user_id: "U123".into()
            }
        );
    }

    #[test]
    fn birthday_id_without_user_is_generic() {
        let notification = with_id("BIRTHDAY-TODAY-");
        assert!(matches!(
            classify(&notification),
            Classification::Generic(_)
        ));
    }

    #[test]
    fn broadcast_id_yields_life_event() {
        let notification = with_id("BROADCAST-wedding-U45-123");
        assert_eq!(
            classify(&notification),
            Classification::LifeEventPrompt {
                event: LifeEvent::Wedding,
                target_user_id: "U45".into()
            }
        );
        let funeral = with_id("BROADCAST-funeral-U7");
        assert_eq!(
            classify(&funeral),
            Classification::LifeEventPrompt {
                event: LifeEvent::Funeral,
                target_user_id: "U7".into()
            }
        );
    }

    #[test]
    fn broadcast_with_unknown_kind_or_missing_user_is_generic() {
        for id in ["BROADCAST-unknown-U45-123", "BROADCAST-wedding", "BROADCAST-"] {
            let notification = with_id(id);
            assert!(
                matches!(classify(&notification), Classification::Generic(_)),
                "{id} should classify as generic"
            );
        }
    }

    #[test]
    fn encoded_routes_decode_back() {
        let birthday = NotificationRoute::BirthdayToday {
            user_id: "U9".into(),
        };
        assert_eq!(birthday.encode(1700000000000), "BIRTHDAY-TODAY-U9-1700000000000");
        assert_eq!(NotificationRoute::decode(&birthday.encode(5)), birthday);

        let opaque_id = NotificationRoute::Opaque.encode(5);
        assert_eq!(NotificationRoute::decode(&opaque_id), NotificationRoute::Opaque);
    }

    #[test]
    fn generic_classification_has_no_compose_request() {
        let notification = with_id("TASK-1");
        assert!(classify(&notification).compose_request().is_none());

        let birthday = with_id("BIRTHDAY-TODAY-U1-2");
        let request = classify(&birthday).compose_request().expect("request");
        assert_eq!(request.kind(), WishKind::Birthday);
        assert_eq!(request.target_user_id(), "U1");
    }

    #[test]
    fn missing_or_unknown_type_deserializes_as_error() {
        let parsed: Notification =
            serde_json::from_str(r#"{"id":"a","title":"t","message":"m"}"#).expect("parse");
        assert_eq!(parsed.severity, Severity::Error);
        assert!(!parsed.read);
        assert!(parsed.time.is_none());

        let parsed: Notification =
            serde_json::from_str(r#"{"id":"a","title":"t","message":"m","type":"warning"}"#)
                .expect("parse");
        assert_eq!(parsed.severity, Severity::Error);
    }

    #[test]
    fn null_type_and_read_fall_back_to_defaults() {
        let parsed: Notification = serde_json::from_str(
            r#"{"id":"a","title":"t","message":"m","type":null,"read":null,"time":null}"#,
        )
        .expect("parse");
        assert_eq!(parsed.severity, Severity::Error);
        assert!(!parsed.read);
        assert!(parsed.time.is_none());

        let parsed: Notification =
            serde_json::from_str(r#"{"id":"a","title":"t","message":"m","type":"info","read":true}"#)
                .expect("parse");
        assert_eq!(parsed.severity, Severity::Info);
        assert!(parsed.read);
    }
}
