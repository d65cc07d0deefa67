pub mod boundary;
pub mod engagement;
pub mod feed;
pub mod identity;
pub mod notification;
pub mod seed;
pub mod service;
pub mod storage;
pub mod store;
pub mod theme;
pub mod toast;
pub mod wish;

pub use crate::service::{NotificationCenter, NotificationCenterBuilder};
