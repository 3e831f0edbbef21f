use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;

/// One unread message from a relevant session, tagged with enough context
/// to render it without further lookups.
#[derive(Serialize, Debug, Clone, JsonSchema)]
pub struct NotificationItem {
    pub message_id: Uuid,
    pub session_id: Uuid,
    pub session_title: String,
    pub author_id: Uuid,
    pub author_label: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct NotificationDigest {
    pub count: i64,
    pub items: Vec<NotificationItem>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Deserialize, Debug, JsonSchema)]
pub struct MarkCheckedRequest {
    /// Marker timestamp; defaults to the server's current time when omitted.
    pub checked_at: Option<DateTime<Utc>>,
}
