/// Notification models
use crate::store::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A citizen filed a new complaint
    ComplaintNew,
    /// A complaint changed status
    ComplaintUpdate,
    /// A complaint was assigned to the recipient
    ComplaintAssigned,
    /// Someone commented on a complaint
    ComplaintComment,
    /// A complaint was removed by an admin
    ComplaintDeleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ComplaintNew => "complaint_new",
            NotificationKind::ComplaintUpdate => "complaint_update",
            NotificationKind::ComplaintAssigned => "complaint_assigned",
            NotificationKind::ComplaintComment => "complaint_comment",
            NotificationKind::ComplaintDeleted => "complaint_deleted",
        }
    }
}

/// Notification document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    /// Complaint the notification points at
    #[serde(default)]
    pub reference_id: Option<String>,
    pub read: bool,
    #[serde(with = "time")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "time::option")]
    pub read_at: Option<DateTime<Utc>>,
}

/// Content of a notification before it is addressed
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub reference_id: Option<String>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            reference_id: None,
        }
    }

    pub fn about(mut self, complaint_id: &str) -> Self {
        self.reference_id = Some(complaint_id.to_string());
        self
    }
}

/// Outcome of a fan-out to several recipients
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanOutReport {
    /// Recipients whose notification was written
    pub delivered: Vec<String>,
    /// Recipients whose write failed, with the error message
    pub failed: Vec<(String, String)>,
}

impl FanOutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
