//! Notifications domain - in-app notification rows

pub mod models;

pub use models::{Notification, NotificationKind};
