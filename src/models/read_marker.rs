use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-user timestamp below which messages are considered seen.
/// A missing row means the user has never opened the notification view,
/// which is treated as the epoch: all history from others is unread.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReadMarker {
    pub user_id: Uuid,
    pub last_checked_at: DateTime<Utc>,
}
