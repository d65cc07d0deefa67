use std::fmt::Display;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::{
    notification::{classify, ComposeRequest, Notification, Severity},
    store::{NotificationStore, StoreError},
};

const TIME_FORMAT: &str = "%H:%M %d/%m/%Y";
const BADGE_CAP: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedIcon {
    Alert,
    Success,
    Info,
    Error,
}

impl FeedIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            FeedIcon::Alert => "⚠",
            FeedIcon::Success => "✔",
            FeedIcon::Info => "ℹ",
            FeedIcon::Error => "✖",
        }
    }
}

impl From<Severity> for FeedIcon {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Alert => FeedIcon::Alert,
            Severity::Success => FeedIcon::Success,
            Severity::Info => FeedIcon::Info,
            Severity::Error => FeedIcon::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    pub id: String,
    pub title: String,
    pub message: String,
    pub display_time: String,
    pub icon: FeedIcon,
    pub read: bool,
}

/// Everything the bell dropdown needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedView {
    pub unread_count: usize,
    pub rows: Vec<FeedRow>,
    pub can_clear_all: bool,
}

impl FeedView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Text for the bell badge, `None` when nothing is unread.
    pub fn badge_label(&self) -> Option<String> {
        match self.unread_count {
            0 => None,
            n if n > BADGE_CAP => Some(format!("{BADGE_CAP}+")),
            n => Some(n.to_string()),
        }
    }
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

/// Milliseconds since the epoch; missing or unparsable times count as 0.
pub fn sort_key(time: Option<&str>) -> i64 {
    time.and_then(parse_time)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

pub fn sort_newest_first(notifications: &mut [Notification]) {
    notifications.sort_by_key(|n| std::cmp::Reverse(sort_key(n.time.as_deref())));
}

pub fn display_time<Tz>(time: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(raw) = time else {
        return String::new();
    };
    match parse_time(raw) {
        Some(dt) => dt.with_timezone(tz).format(TIME_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn build_feed<Tz>(notifications: &[Notification], can_clear_all: bool, tz: &Tz) -> FeedView
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut sorted = notifications.to_vec();
    sort_newest_first(&mut sorted);
    let rows = sorted
        .into_iter()
        .map(|n| FeedRow {
            display_time: display_time(n.time.as_deref(), tz),
            icon: FeedIcon::from(n.severity),
            read: n.read,
            id: n.id,
            title: n.title,
            message: n.message,
        })
        .collect();
    FeedView {
        unread_count: unread_count(notifications),
        rows,
        can_clear_all,
    }
}

/// What a click on a feed row leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    ShowDetail(Notification),
    Compose(ComposeRequest),
}

/// Marks the notification read and classifies it.
pub fn activate(store: &dyn NotificationStore, id: &str) -> Result<Activation, StoreError> {
    let notification = store
        .notifications()
        .into_iter()
        .find(|n| n.id == id)
        .ok_or_else(|| StoreError::UnknownNotification(id.to_string()))?;
    let changed = store.mark_read(id)?;
    tracing::debug!(id, changed, "notification activated");
    let activation = match classify(&notification).compose_request() {
        Some(request) => Activation::Compose(request),
        None => Activation::ShowDetail(Notification {
            read: true,
            ..notification
        }),
    };
    Ok(activation)
}
