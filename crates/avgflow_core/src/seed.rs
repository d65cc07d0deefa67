use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    identity::User,
    notification::{LifeEvent, Notification, NotificationRoute, Severity},
    wish::Wish,
};

/// Initial contents for the in-memory store and the user directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub wishes: Vec<Wish>,
}

impl Seed {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("unable to read seed {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("invalid seed {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            users = seed.users.len(),
            notifications = seed.notifications.len(),
            "seed loaded"
        );
        Ok(seed)
    }

    pub fn demo(now: DateTime<Utc>) -> Self {
        let users = vec![
            User::new("U001", "Nguyễn Văn An", "an.nguyen@avgflow.vn").admin(),
            User::new("U002", "Trần Thị Bình", "binh.tran@avgflow.vn"),
            User::new("U003", "Lê Minh Châu", "chau.le@avgflow.vn"),
            User::new("U004", "Phạm Quốc Dũng", "dung.pham@avgflow.vn"),
        ];
        let stamp = |offset: Duration| {
            (now - offset).to_rfc3339_opts(SecondsFormat::Secs, true)
        };
        let millis = now.timestamp_millis();
        let notifications = vec![
            Notification::new(
                NotificationRoute::BirthdayToday {
                    user_id: "U002".into(),
                }
                .encode(millis),
                "Sinh nhật hôm nay 🎂",
                "Hôm nay là sinh nhật của Trần Thị Bình. Gửi lời chúc ngay!",
                Severity::Info,
            )
            .at(stamp(Duration::minutes(5))),
            Notification::new(
                NotificationRoute::Broadcast {
                    event: LifeEvent::Wedding,
                    user_id: "U003".into(),
                }
                .encode(millis),
                "Tin vui",
                "Lê Minh Châu sắp tổ chức đám cưới.",
                Severity::Success,
            )
            .at(stamp(Duration::hours(2))),
            Notification::new(
                NotificationRoute::Opaque.encode(millis),
                "Hạn nộp bảng chấm công",
                "Vui lòng hoàn thành bảng chấm công tháng này trước thứ Sáu.",
                Severity::Alert,
            )
            .at(stamp(Duration::days(1))),
            Notification::new(
                NotificationRoute::Opaque.encode(millis),
                "Cập nhật hệ thống",
                "Phiên bản mới đã được triển khai.",
                Severity::Error,
            ),
        ];
        Self {
            users,
            notifications,
            wishes: Vec::new(),
        }
    }
}
