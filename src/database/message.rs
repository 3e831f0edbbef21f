use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::message::Message;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait MessageRepository {
    /// Appends a message to the session's log. Fails with `NotFound` when
    /// the session has been deleted.
    async fn create_message(&self, session_id: &Uuid, author_user_id: &Uuid, body: &str) -> Result<Message, AppError>;
    /// All messages for one session, oldest first.
    async fn list_messages_for_session(&self, session_id: &Uuid) -> Result<Vec<Message>, AppError>;
}

#[async_trait::async_trait]
impl MessageRepository for PostgresRepository {
    async fn create_message(&self, session_id: &Uuid, author_user_id: &Uuid, body: &str) -> Result<Message, AppError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            WITH inserted AS (
                INSERT INTO session_message (session_id, author_user_id, body)
                VALUES ($1, $2, $3)
                RETURNING id, session_id, author_user_id, body, created_at
            )
            SELECT i.id, i.session_id, i.author_user_id, u.email AS author_email, i.body, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.author_user_id
            "#,
        )
        .bind(session_id)
        .bind(author_user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => AppError::NotFound("Session not found".to_string()),
            other => AppError::from(other),
        })?;

        Ok(message)
    }

    async fn list_messages_for_session(&self, session_id: &Uuid) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT m.id, m.session_id, m.author_user_id, u.email AS author_email, m.body, m.created_at
            FROM session_message m
            JOIN users u ON u.id = m.author_user_id
            WHERE m.session_id = $1
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
