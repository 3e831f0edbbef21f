use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

/// A chat entry scoped to one session. Immutable once created; removed
/// only when its session is deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub author_user_id: Uuid,
    pub author_email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct MessageRequest {
    #[validate(length(min = 1, max = 1000))]
    pub body: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub author_user_id: Uuid,
    pub author_email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            session_id: message.session_id,
            author_user_id: message.author_user_id,
            author_email: message.author_email.clone(),
            body: message.body.clone(),
            created_at: message.created_at,
        }
    }
}
