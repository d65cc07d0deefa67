use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::LifeEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WishKind {
    Birthday,
    Wedding,
    Funeral,
}

impl WishKind {
    /// Opening line seeded into a fresh draft.
    pub fn template(self) -> &'static str {
        match self {
            WishKind::Birthday => {
                "Chúc mừng sinh nhật! Chúc bạn tuổi mới thật nhiều sức khỏe, niềm vui và thành công. "
            }
            WishKind::Wedding => {
                "Chúc mừng hạnh phúc! Chúc hai bạn trăm năm hạnh phúc, sớm sinh quý tử. "
            }
            WishKind::Funeral => {
                "Xin thành kính chia buồn cùng bạn và gia đình. Mong bạn sớm vượt qua mất mát này. "
            }
        }
    }

    pub fn quick_inserts(self) -> [&'static str; 3] {
        match self {
            WishKind::Birthday => ["🎂", "🎉", "🎁"],
            WishKind::Wedding => ["💍", "💐", "🥂"],
            WishKind::Funeral => ["🕯️", "🙏", "🤍"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WishKind::Birthday => "sinh nhật",
            WishKind::Wedding => "đám cưới",
            WishKind::Funeral => "chia buồn",
        }
    }
}

impl From<LifeEvent> for WishKind {
    fn from(event: LifeEvent) -> Self {
        match event {
            LifeEvent::Wedding => WishKind::Wedding,
            LifeEvent::Funeral => WishKind::Funeral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wish {
    pub id: String,
    pub from_user_id: String,
    pub from_user_name: String,
    pub to_user_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(rename = "type")]
    pub kind: WishKind,
}
