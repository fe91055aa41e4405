//! In-app notifications, stored per recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Event name that produced it, e.g. `complaint_status_updated`.
    pub kind: String,
    pub title: String,
    pub message: String,
    pub complaint_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: &str,
        title: impl Into<String>,
        message: impl Into<String>,
        complaint_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind: kind.to_string(),
            title: title.into(),
            message: message.into(),
            complaint_id,
            read: false,
            created_at: now,
        }
    }
}
